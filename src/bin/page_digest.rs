//! page-digest command-line front end.

use std::error::Error;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use page_digest::assistant;
use page_digest::encoding;
use page_digest::fetch::{FetchedPage, PageFetcher, RemotePage};
use page_digest::router::{Background, Request};
use page_digest::session::{ChatReply, PopupState, Session};
use page_digest::storage::{Settings, Store};
use page_digest::{build_provider, extract_page, text, Options, ProviderKind};

/// Summarize web pages and ask questions about them.
#[derive(Parser)]
#[command(name = "page-digest")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the main text of a page
    Extract {
        /// URL, file path, or `-` for stdin
        source: String,
    },

    /// Extract a page and summarize it
    Summarize {
        /// URL, file path, or `-` for stdin
        source: String,
    },

    /// Ask about the last summarized page
    Chat {
        message: String,

        /// Page to use when none is stored
        #[arg(long)]
        url: Option<String>,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check the configured API key with a tiny request
    TestConnection,

    /// Clear all stored data, settings included
    Reset,

    /// Dump stored data
    DebugInfo,

    /// Forget the chat history
    ClearChat,
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        /// openai, anthropic or gemini
        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        max_tokens: Option<u32>,

        #[arg(long)]
        temperature: Option<f32>,
    },
}

#[derive(Serialize)]
struct ExtractOutput<'a> {
    #[serde(flatten)]
    page: &'a page_digest::ExtractedPage,
    estimated_tokens: usize,
    reading_time_minutes: usize,
    estimated_cost: page_digest::provider::CostEstimate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    page_digest::logging::init(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let store = match &cli.data_dir {
        Some(dir) => Store::open(dir)?,
        None => Store::open_default()?,
    };

    match cli.command {
        Commands::Extract { source } => {
            let page = load_page(&source).await?;
            let extracted = extract_page(&page.html, Some(&page.url), &Options::default())?;
            if cli.json {
                let settings = store.load_settings()?;
                let tokens = text::estimate_tokens(&extracted.content);
                let output = ExtractOutput {
                    page: &extracted,
                    estimated_tokens: tokens,
                    reading_time_minutes: text::reading_time_minutes(&extracted.content),
                    estimated_cost: settings.provider.estimate_cost(tokens),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", extracted.content);
            }
        }

        Commands::Summarize { source } => {
            let page = load_page(&source).await?;
            let background = Arc::new(Background::new(store.clone()));
            let router = background.spawn();
            stage_page(&background, &page)?;

            let session = Session::new(router, store);
            match session.open()? {
                PopupState::Error(message) => {
                    eprintln!("{message}");
                    return Ok(ExitCode::FAILURE);
                }
                PopupState::Initial => {
                    eprintln!("Nothing to summarize");
                    return Ok(ExitCode::FAILURE);
                }
                PopupState::Loading => {}
            }

            let view = session.process_summarization().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", view.title);
                if !view.url.is_empty() {
                    println!("{}", text::truncate_url(&view.url, 50));
                }
                println!();
                println!("{}", text::format_summary(&view.summary));
            }
        }

        Commands::Chat { message, url } => {
            let router = Arc::new(Background::new(store.clone())).spawn();
            let mut session = Session::new(router, store);
            if let Some(url) = url {
                session = session.with_page_source(RemotePage::new(PageFetcher::new()?, url));
            }

            match session.send_chat_message(&message).await {
                None => {}
                Some(ChatReply::Failed(message)) => {
                    eprintln!("{message}");
                    return Ok(ExitCode::FAILURE);
                }
                Some(reply) => println!("{}", reply.text()),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => show_config(&store.load_settings()?, cli.json)?,
            ConfigAction::Set {
                provider,
                api_key,
                max_tokens,
                temperature,
            } => {
                let mut settings = store.load_stored_settings()?;
                if let Some(provider) = provider {
                    settings.provider = provider.parse()?;
                }
                if let Some(api_key) = api_key {
                    settings.api_key = api_key;
                }
                if let Some(max_tokens) = max_tokens {
                    settings.max_tokens = max_tokens;
                }
                if let Some(temperature) = temperature {
                    settings.temperature = temperature;
                }
                if !settings.provider.validate_api_key(settings.api_key.trim()) {
                    eprintln!(
                        "Warning: this does not look like a {} key. Keys are available at {}",
                        settings.provider.display_name(),
                        settings.provider.api_key_url()
                    );
                }
                store.save_settings(&settings)?;
                println!("Settings saved successfully!");
            }
        },

        Commands::TestConnection => {
            let settings = store.load_settings()?;
            if !settings.has_api_key() {
                eprintln!("Please enter an API key first");
                return Ok(ExitCode::FAILURE);
            }
            let provider = build_provider(settings.provider, &settings.api_key)?;
            match assistant::test_connection(provider.as_ref()).await {
                Ok(reply) => {
                    println!("Connection successful! API is working correctly.");
                    tracing::debug!(%reply, "Test reply");
                }
                Err(e) => {
                    eprintln!("Connection failed: {}", e.friendly_message());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Commands::Reset => {
            store.clear_all()?;
            println!("Storage cleared!");
        }

        Commands::DebugInfo => {
            let router = Arc::new(Background::new(store)).spawn();
            let response = router
                .send(Request::GetDebugInfo)
                .await?
                .into_result("Failed to read debug info")?;
            println!("{}", serde_json::to_string_pretty(&response.debug_info)?);
        }

        Commands::ClearChat => {
            let router = Arc::new(Background::new(store.clone())).spawn();
            Session::new(router, store).clear_chat()?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Read a page from a URL, a file, or stdin (`-`).
/// Store the page for summarizing. Extraction failures are recorded in
/// storage and reported by the session, so only other errors surface here.
fn stage_page(background: &Background, page: &FetchedPage) -> page_digest::Result<()> {
    match background.summarize_page_action(page) {
        Ok(()) | Err(page_digest::Error::NoContent | page_digest::Error::NoMeaningfulContent) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn load_page(source: &str) -> Result<FetchedPage, Box<dyn Error>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return Ok(PageFetcher::new()?.fetch(source).await?);
    }

    let bytes = if source == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(source)?
    };
    let url = if source == "-" {
        "stdin".to_string()
    } else {
        format!("file://{source}")
    };
    Ok(FetchedPage::from_html(url, encoding::decode_html(&bytes, None)))
}

fn show_config(settings: &Settings, json: bool) -> Result<(), Box<dyn Error>> {
    let kind: ProviderKind = settings.provider;
    let key_state = if !settings.has_api_key() {
        "not set"
    } else if kind.validate_api_key(settings.api_key.trim()) {
        "set"
    } else {
        "set (unexpected format)"
    };

    if json {
        let value = serde_json::json!({
            "provider": kind,
            "apiKey": key_state,
            "maxTokens": settings.max_tokens,
            "temperature": settings.temperature,
            "apiKeyUrl": kind.api_key_url(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("provider:    {} ({})", kind, kind.display_name());
        println!("api key:     {key_state}");
        println!("max tokens:  {}", settings.max_tokens);
        println!("temperature: {}", settings.temperature);
        println!("get a key:   {}", kind.api_key_url());
    }
    Ok(())
}
