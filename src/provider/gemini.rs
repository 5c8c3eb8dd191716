//! Google Gemini `generateContent` adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    http_client, reply_text, send_json, CompletionRequest, Provider, ProviderError, ProviderKind,
    Role, DEFAULT_TIMEOUT,
};

const BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Google Gemini provider.
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
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

    /// Gemini has no system role here: the system prompt is folded into the
    /// first user turn, and assistant turns use the `model` role.
    pub(crate) fn build_request(&self, request: &CompletionRequest) -> GenerateContentRequest {
        let mut system = request.system.as_deref();
        let contents = request
            .messages
            .iter()
            .map(|m| {
                let text = match (m.role, system.take()) {
                    (Role::User, Some(sys)) => format!("{sys}\n\n{}", m.content),
                    (Role::Assistant, Some(sys)) => {
                        // Keep the prompt for the next user turn
                        system = Some(sys);
                        m.content.clone()
                    }
                    (_, None) => m.content.clone(),
                };
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Content {
                    role: Some(role.to_string()),
                    parts: vec![Part { text: Some(text) }],
                }
            })
            .collect();

        GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: request.max_tokens,
                stop_sequences: Vec::new(),
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = self.build_request(request);
        debug!(model = %self.model, contents = body.contents.len(), "Gemini request");

        let builder = self
            .client
            .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        let response: GenerateContentResponse = send_json(builder, self.kind()).await?;

        let text = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);
        reply_text(text, self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatMessage;

    #[test]
    fn system_prompt_folded_into_first_user_turn() {
        let provider = GeminiProvider::new("key").unwrap();
        let request = CompletionRequest::new(vec![
            ChatMessage::user("First"),
            ChatMessage::assistant("Reply"),
            ChatMessage::user("Second"),
        ])
        .with_system("Be brief");

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Be brief\n\nFirst");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Reply");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "Second");
    }

    #[test]
    fn leading_assistant_turn_defers_system_prompt() {
        let provider = GeminiProvider::new("key").unwrap();
        let request = CompletionRequest::new(vec![
            ChatMessage::assistant("Earlier answer"),
            ChatMessage::user("Question"),
        ])
        .with_system("Context");

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Earlier answer");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Context\n\nQuestion");
    }

    #[test]
    fn generation_config_and_safety() {
        let provider = GeminiProvider::new("key").unwrap();
        let request = CompletionRequest::new(vec![ChatMessage::user("Hi")]).with_temperature(0.3);

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        let config = &json["generationConfig"];
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 200);
        assert!(config["stopSequences"].as_array().unwrap().is_empty());
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn missing_candidates_is_invalid() {
        let response: GenerateContentResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        let text = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);
        assert_eq!(
            reply_text(text, ProviderKind::Gemini),
            Err(ProviderError::InvalidResponse("Google Gemini".into()))
        );
    }
}
