//! Error types for page-digest.
//!
//! `Error` is the crate-level error returned by extraction, storage and
//! routing operations. Provider failures are carried as [`ProviderError`]
//! so callers can still reach the HTTP status.

use crate::provider::ProviderError;

/// Error type for page-digest operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The page yielded no text at all.
    #[error("No content could be extracted from this page")]
    NoContent,

    /// Text was extracted but failed the quality checks.
    #[error("Unable to extract meaningful content from this page")]
    NoMeaningfulContent,

    /// Fetching the page failed.
    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    /// Reading or writing the key-value store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Settings were rejected before being saved.
    #[error("{0}")]
    InvalidSettings(String),

    /// A provider adapter call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The background service did not answer in time.
    #[error("Request timed out. Please try again.")]
    Timeout,

    /// The background service dropped the request without replying.
    #[error("No response received from background script")]
    NoResponse,

    /// The background service is not running.
    #[error("Extension background script is not responding")]
    Disconnected,

    /// A response carried `success: false`.
    #[error("{0}")]
    Remote(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for page-digest operations.
pub type Result<T> = std::result::Result<T, Error>;
