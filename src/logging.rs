//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "page_digest=debug,info"
    } else {
        "warn"
    }
}

/// Install a stderr subscriber.
///
/// `RUST_LOG` wins over `verbose`. Calling this twice is a no-op.
pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
