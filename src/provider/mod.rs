//! Provider adapters.
//!
//! Each adapter maps a [`CompletionRequest`] onto one vendor's REST API and
//! maps the reply back to plain text. The three adapters share the request
//! type, the error type and the HTTP helpers defined here.

mod anthropic;
mod error;
mod gemini;
mod openai;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Client-side timeout for a provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Supported vendors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    /// Every supported provider.
    pub const ALL: [ProviderKind; 3] = [Self::OpenAi, Self::Anthropic, Self::Gemini];

    /// Identifier used in settings.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Name shown to users.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Google Gemini",
        }
    }

    /// Where to obtain an API key.
    #[must_use]
    pub fn api_key_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://platform.openai.com/api-keys",
            Self::Anthropic => "https://console.anthropic.com/",
            Self::Gemini => "https://aistudio.google.com/app/apikey",
        }
    }

    /// Whether `api_key` looks like a key for this provider.
    ///
    /// A format check only; the key may still be revoked or wrong.
    #[must_use]
    pub fn validate_api_key(self, api_key: &str) -> bool {
        let len = api_key.chars().count();
        match self {
            Self::OpenAi => api_key.starts_with("sk-") && len > 20,
            Self::Anthropic => api_key.starts_with("sk-ant-") && len > 20,
            Self::Gemini => (30..=50).contains(&len),
        }
    }

    /// Per-token (input, output) prices in US dollars.
    fn token_prices(self) -> (f64, f64) {
        match self {
            Self::OpenAi => (0.0015 / 1_000.0, 0.002 / 1_000.0),
            Self::Anthropic => (0.25 / 1_000_000.0, 1.25 / 1_000_000.0),
            Self::Gemini => (0.075 / 1_000_000.0, 0.30 / 1_000_000.0),
        }
    }

    /// Estimated cost of a call sending `input_tokens`.
    ///
    /// Output is assumed to be a fifth of the input.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn estimate_cost(self, input_tokens: usize) -> CostEstimate {
        let (input_price, output_price) = self.token_prices();
        let output_tokens = (input_tokens as f64 * 0.2).ceil() as usize;
        let input = input_tokens as f64 * input_price;
        let output = output_tokens as f64 * output_price;
        CostEstimate {
            total: input + output,
            input,
            output,
            input_tokens,
            output_tokens,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or(ProviderError::UnsupportedProvider(id))
    }
}

/// Estimated dollar cost of one provider call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub total: f64,
    pub input: f64,
    pub output: f64,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Vendor-neutral completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Instructions placed ahead of the conversation.
    pub system: Option<String>,
    /// Conversation, oldest first; the last message is the user's turn.
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub const DEFAULT_MAX_TOKENS: u32 = 200;

    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            system: None,
            messages,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A chat-completion style API.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which vendor this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Send the request and return the trimmed reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Base URL overrides, one per vendor. `None` keeps the public endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
}

impl Endpoints {
    /// Send every vendor to the same host.
    #[must_use]
    pub fn all(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            openai: Some(base_url.clone()),
            anthropic: Some(base_url.clone()),
            gemini: Some(base_url),
        }
    }
}

/// Build the adapter for `kind`, rejecting an empty key.
pub fn build_provider(kind: ProviderKind, api_key: &str) -> Result<Box<dyn Provider>, ProviderError> {
    build_provider_at(kind, api_key, &Endpoints::default())
}

/// Build the adapter for `kind` against the given endpoints.
pub fn build_provider_at(
    kind: ProviderKind,
    api_key: &str,
    endpoints: &Endpoints,
) -> Result<Box<dyn Provider>, ProviderError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(ProviderError::MissingApiKey);
    }
    let provider: Box<dyn Provider> = match kind {
        ProviderKind::OpenAi => {
            let mut p = OpenAiProvider::new(api_key)?;
            if let Some(url) = &endpoints.openai {
                p = p.with_base_url(url.as_str());
            }
            Box::new(p)
        }
        ProviderKind::Anthropic => {
            let mut p = AnthropicProvider::new(api_key)?;
            if let Some(url) = &endpoints.anthropic {
                p = p.with_base_url(url.as_str());
            }
            Box::new(p)
        }
        ProviderKind::Gemini => {
            let mut p = GeminiProvider::new(api_key)?;
            if let Some(url) = &endpoints.gemini {
                p = p.with_base_url(url.as_str());
            }
            Box::new(p)
        }
    };
    Ok(provider)
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

/// Vendor error envelope: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Turn a non-success response into a [`ProviderError`].
async fn error_from_response(response: reqwest::Response, kind: ProviderKind) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message);
    tracing::warn!(provider = %kind, status, "Provider returned an error");
    ProviderError::from_api_response(status, message, kind.display_name())
}

/// Send a prepared request and decode the JSON reply.
async fn send_json<T: serde::de::DeserializeOwned>(
    builder: reqwest::RequestBuilder,
    kind: ProviderKind,
) -> Result<T, ProviderError> {
    let response = builder
        .send()
        .await
        .map_err(|e| ProviderError::from_transport(&e))?;

    if !response.status().is_success() {
        return Err(error_from_response(response, kind).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|_| ProviderError::InvalidResponse(kind.display_name().to_string()))
}

/// Trim reply text, treating blank replies as malformed.
fn reply_text(text: Option<String>, kind: ProviderKind) -> Result<String, ProviderError> {
    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse(kind.display_name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_provider_ids() {
        assert_eq!("openai".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!(" Anthropic ".parse::<ProviderKind>(), Ok(ProviderKind::Anthropic));
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!(
            "mistral".parse::<ProviderKind>(),
            Err(ProviderError::UnsupportedProvider("mistral".into()))
        );
    }

    #[test]
    fn provider_kind_serde_uses_ids() {
        for kind in ProviderKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.id());
            let back: ProviderKind = serde_json::from_value(json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn api_key_formats() {
        assert!(ProviderKind::OpenAi.validate_api_key("sk-abcdefghijklmnopqrstuv"));
        assert!(!ProviderKind::OpenAi.validate_api_key("sk-short"));
        assert!(!ProviderKind::OpenAi.validate_api_key("pk-abcdefghijklmnopqrstuv"));

        assert!(ProviderKind::Anthropic.validate_api_key("sk-ant-REDACTED"));
        assert!(!ProviderKind::Anthropic.validate_api_key("sk-abcdefghijklmnopqrstuv"));

        assert!(ProviderKind::Gemini.validate_api_key(&"A".repeat(39)));
        assert!(!ProviderKind::Gemini.validate_api_key(&"A".repeat(29)));
        assert!(!ProviderKind::Gemini.validate_api_key(&"A".repeat(51)));
    }

    #[test]
    fn cost_estimate_openai() {
        let cost = ProviderKind::OpenAi.estimate_cost(1000);
        assert_eq!(cost.output_tokens, 200);
        assert!((cost.input - 0.0015).abs() < 1e-12);
        assert!((cost.output - 0.0004).abs() < 1e-12);
        assert!((cost.total - 0.0019).abs() < 1e-12);
    }

    #[test]
    fn cost_estimate_rounds_output_up() {
        let cost = ProviderKind::Gemini.estimate_cost(3);
        assert_eq!(cost.output_tokens, 1);
        assert_eq!(cost.input_tokens, 3);
    }

    #[test]
    fn build_provider_rejects_blank_key() {
        for kind in ProviderKind::ALL {
            let result = build_provider(kind, "   ");
            assert!(matches!(result, Err(ProviderError::MissingApiKey)));
        }
    }

    #[test]
    fn build_provider_matches_kind() {
        for kind in ProviderKind::ALL {
            let provider = build_provider(kind, "test-key").unwrap();
            assert_eq!(provider.kind(), kind);
        }
    }

    #[test]
    fn reply_text_trims_and_rejects_blank() {
        assert_eq!(reply_text(Some("  hi \n".into()), ProviderKind::OpenAi), Ok("hi".into()));
        assert_eq!(
            reply_text(Some("   ".into()), ProviderKind::Gemini),
            Err(ProviderError::InvalidResponse("Google Gemini".into()))
        );
        assert!(reply_text(None, ProviderKind::Anthropic).is_err());
    }

    #[test]
    fn request_builder_defaults() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(request.max_tokens, 200);
        assert!(request.system.is_none());
        assert!(request.temperature.is_none());

        let request = request.with_system("sys").with_max_tokens(50).with_temperature(0.3);
        assert_eq!(request.system.as_deref(), Some("sys"));
        assert_eq!(request.max_tokens, 50);
        assert_eq!(request.temperature, Some(0.3));
    }
}
