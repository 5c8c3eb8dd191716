//! Anthropic messages adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    http_client, reply_text, send_json, CompletionRequest, Provider, ProviderError, ProviderKind,
    DEFAULT_TIMEOUT,
};

const BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Serialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Anthropic provider.
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: http_client(timeout)?,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub(crate) fn build_request(&self, request: &CompletionRequest) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = self.build_request(request);
        debug!(model = %body.model, messages = body.messages.len(), "Anthropic request");

        let builder = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let response: ApiResponse = send_json(builder, self.kind()).await?;

        let text = response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text);
        reply_text(text, self.kind())
    }
}
