use std::time::Duration;

use page_digest::assistant::{self, Sampling};
use page_digest::provider::{
    build_provider_at, AnthropicProvider, Endpoints, GeminiProvider, OpenAiProvider,
};
use page_digest::{ChatMessage, CompletionRequest, Provider, ProviderError, ProviderKind};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn question() -> CompletionRequest {
    CompletionRequest::new(vec![ChatMessage::user("What is this page about?")])
        .with_system("Answer briefly")
        .with_temperature(0.3)
}

#[tokio::test]
async fn openai_reply_is_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "max_tokens": 200,
            "messages": [{"role": "system", "content": "Answer briefly"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  It is about rivers.\n"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("sk-test-key").unwrap().with_base_url(server.uri());
    let reply = provider.complete(&question()).await.unwrap();
    assert_eq!(reply, "It is about rivers.");
}

#[tokio::test]
async fn anthropic_sends_version_header_and_system_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-haiku-20240307",
            "system": "Answer briefly"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Rivers."}]
        })))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new("sk-ant-key").unwrap().with_base_url(server.uri());
    assert_eq!(provider.complete(&question()).await.unwrap(), "Rivers.");
}

#[tokio::test]
async fn gemini_passes_key_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-latest:generateContent"))
        .and(query_param("key", "gemini-key"))
        .and(body_partial_json(json!({
            "generationConfig": {"topK": 40, "maxOutputTokens": 200}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Rivers, mostly."}], "role": "model"}}]
        })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("gemini-key").unwrap().with_base_url(server.uri());
    assert_eq!(provider.complete(&question()).await.unwrap(), "Rivers, mostly.");
}

#[tokio::test]
async fn vendor_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("sk-bad").unwrap().with_base_url(server.uri());
    let err = provider.complete(&question()).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Incorrect API key provided");
    assert_eq!(err.friendly_message(), "Invalid API key. Please check your API key in settings.");
}

#[tokio::test]
async fn error_without_body_uses_vendor_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway"))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new("sk-ant-key").unwrap().with_base_url(server.uri());
    let err = provider.complete(&question()).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to get response from Anthropic");
}

#[tokio::test]
async fn rate_limit_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("gemini-key").unwrap().with_base_url(server.uri());
    let err = provider.complete(&question()).await.unwrap_err();
    assert_eq!(err.to_string(), "Resource has been exhausted");
    assert_eq!(err.friendly_message(), "Rate limit exceeded. Please try again later.");
}

#[tokio::test]
async fn missing_candidates_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new("gemini-key").unwrap().with_base_url(server.uri());
    let err = provider.complete(&question()).await.unwrap_err();
    assert_eq!(err, ProviderError::InvalidResponse("Google Gemini".to_string()));
    assert_eq!(err.to_string(), "Invalid response from Google Gemini");
}

#[tokio::test]
async fn empty_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("sk-key").unwrap().with_base_url(server.uri());
    let err = provider.complete(&question()).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid response from OpenAI");
}

#[tokio::test]
async fn slow_vendor_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_timeout("sk-key", Duration::from_millis(200))
        .unwrap()
        .with_base_url(server.uri());
    let err = provider.complete(&question()).await.unwrap_err();
    assert_eq!(err, ProviderError::Timeout);
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let provider = OpenAiProvider::new("sk-key")
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    let err = provider.complete(&question()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn summarize_through_factory() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({
            "max_tokens": 120,
            "messages": [{"role": "user", "content": "Please summarize the following webpage content:\n\nA long article."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "A short summary."}]
        })))
        .mount(&server)
        .await;

    let provider =
        build_provider_at(ProviderKind::Anthropic, "sk-ant-key", &Endpoints::all(server.uri())).unwrap();
    let sampling = Sampling {
        max_tokens: 120,
        temperature: 0.3,
    };
    let summary = assistant::summarize(provider.as_ref(), "A long article.", sampling).await.unwrap();
    assert_eq!(summary, "A short summary.");
}

#[tokio::test]
async fn connection_test_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"max_tokens": 50})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "The API connection works."}}]
        })))
        .mount(&server)
        .await;

    let provider =
        build_provider_at(ProviderKind::OpenAi, "sk-key", &Endpoints::all(server.uri())).unwrap();
    let reply = assistant::test_connection(provider.as_ref()).await.unwrap();
    assert_eq!(reply, "The API connection works.");
}
