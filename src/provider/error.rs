//! Provider adapter errors.

/// Error raised by a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No API key has been configured.
    #[error("API key not configured. Please set it in the extension options.")]
    MissingApiKey,

    /// Nothing to summarize.
    #[error("No content provided for summarization")]
    EmptyContent,

    /// Provider identifier not recognized.
    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),

    /// Non-success HTTP status; `message` is the vendor's own text when it sent one.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Success status but the body lacked the expected text.
    #[error("Invalid response from {0}")]
    InvalidResponse(String),

    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The HTTP client gave up waiting.
    #[error("Request timed out. Please try again.")]
    Timeout,
}

impl ProviderError {
    /// Build an API error from a status and the vendor's optional message.
    #[must_use]
    pub fn from_api_response(status: u16, message: Option<String>, vendor: &str) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Failed to get response from {vendor}"));
        Self::Api { status, message }
    }

    /// Map a reqwest transport error.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }

    /// HTTP status for API errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short user-facing message.
    ///
    /// Well-known statuses get a fixed explanation; anything else falls back
    /// to the error's own text.
    #[must_use]
    pub fn friendly_message(&self) -> String {
        match self.status() {
            Some(401) => "Invalid API key. Please check your API key in settings.".to_string(),
            Some(403) => "Access forbidden. Please check your API key permissions.".to_string(),
            Some(429) => "Rate limit exceeded. Please try again later.".to_string(),
            Some(500) => "Server error. Please try again later.".to_string(),
            Some(503) => "Service unavailable. Please try again later.".to_string(),
            _ => self.to_string(),
        }
    }
}
