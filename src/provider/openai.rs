//! OpenAI chat completions adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    http_client, reply_text, send_json, CompletionRequest, Provider, ProviderError, ProviderKind,
    DEFAULT_TIMEOUT,
};

const BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize)]
pub(crate) struct ApiRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub max_tokens: u32,
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
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
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

    /// Point the adapter at another host (e.g. a proxy or a test server).
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
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ApiMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| ApiMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        }));

        ApiRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = self.build_request(request);
        debug!(model = %body.model, messages = body.messages.len(), "OpenAI request");

        let builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ApiResponse = send_json(builder, self.kind()).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        reply_text(text, self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatMessage;

    #[test]
    fn system_prompt_becomes_first_message() {
        let provider = OpenAiProvider::new("sk-test").unwrap();
        let request = CompletionRequest::new(vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi"),
            ChatMessage::user("Summarize"),
        ])
        .with_system("Be brief")
        .with_temperature(0.3);

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "Be brief");
        assert_eq!(json["messages"][2]["role"], "assistant");
        assert_eq!(json["messages"].as_array().unwrap().len(), 4);
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn temperature_omitted_when_unset() {
        let provider = OpenAiProvider::new("sk-test").unwrap().with_model("gpt-4o-mini");
        let request = CompletionRequest::new(vec![ChatMessage::user("Hello")]);

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OpenAiProvider::new("sk-test").unwrap().with_base_url("http://localhost:1234/");
        assert_eq!(provider.base_url, "http://localhost:1234");
    }
}
