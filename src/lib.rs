//! # page-digest
//!
//! Summarize web pages and chat about them with a hosted language model.
//!
//! The crate extracts the readable text of a page, hands it to one of three
//! provider APIs (OpenAI, Anthropic, Google Gemini) and returns a short
//! summary or an answer to a follow-up question. A background service owns
//! every provider call and is reached through a message router; a front-end
//! session drives the summary and chat flows against a small file-backed
//! key-value store.
//!
//! ## Quick Start
//!
//! ```rust
//! use page_digest::{extract_page_content, Options};
//!
//! let body = "Rust makes systems programming approachable for many teams. ".repeat(10);
//! let html = format!(
//!     "<html><head><title>Notes</title></head>\
//!      <body><nav>Menu</nav><article><p>{body}</p></article></body></html>"
//! );
//!
//! let text = extract_page_content(&html, &Options::default())?;
//! assert!(text.starts_with("Rust makes"));
//! assert!(!text.contains("Menu"));
//! # Ok::<(), page_digest::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Content Extraction**: noise removal, main-content selectors, quality checks
//! - **Provider Adapters**: one request type mapped onto three vendor APIs
//! - **Background Router**: request/response messaging with client-side timeouts
//! - **Storage**: `local` and `sync` key-value areas persisted as JSON

mod error;
mod extract;
mod options;

/// Summary, chat and connection-test calls.
pub mod assistant;

/// Conversation history.
pub mod chat;

/// DOM helpers over `dom_query`.
pub mod dom;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Page download.
pub mod fetch;

/// Tracing subscriber setup.
pub mod logging;

/// Title and `<meta>` extraction.
pub mod metadata;

/// Prompt text.
pub mod prompt;

/// Provider adapters.
pub mod provider;

/// Background service and message router.
pub mod router;

/// CSS selector lists used by extraction.
pub mod selectors;

/// Front-end session flows.
pub mod session;

/// Key-value storage.
pub mod storage;

/// Text cleanup and measurement.
pub mod text;

// Public API - re-exports
pub use error::{Error, Result};
pub use extract::{
    extract_bytes, extract_page, extract_page_content, is_valid_content, ContentSource,
    ExtractedPage,
};
pub use options::Options;
pub use provider::{
    build_provider, ChatMessage, CompletionRequest, Provider, ProviderError, ProviderKind, Role,
};

/// Extract the main text of a page with default options.
///
/// # Example
///
/// ```rust
/// let html = "<html><body><p>Too short.</p></body></html>";
/// let err = page_digest::extract(html).unwrap_err();
/// assert_eq!(err.to_string(), "Unable to extract meaningful content from this page");
/// ```
pub fn extract(html: &str) -> Result<String> {
    extract_page_content(html, &Options::default())
}
