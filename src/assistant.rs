//! Summary, chat and connection-test calls on top of a [`Provider`].

use tracing::debug;

use crate::prompt;
use crate::provider::{ChatMessage, CompletionRequest, Provider, ProviderError};

/// Sampling settings applied to every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            max_tokens: CompletionRequest::DEFAULT_MAX_TOKENS,
            temperature: 0.3,
        }
    }
}

/// Page details attached to a chat question.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageContext<'a> {
    pub title: Option<&'a str>,
    pub url: Option<&'a str>,
    pub content: &'a str,
}

/// Summarize page text.
///
/// # Errors
///
/// [`ProviderError::EmptyContent`] for blank content, otherwise whatever the
/// provider call returns.
pub async fn summarize(
    provider: &dyn Provider,
    content: &str,
    sampling: Sampling,
) -> Result<String, ProviderError> {
    if content.trim().is_empty() {
        return Err(ProviderError::EmptyContent);
    }
    debug!(provider = %provider.kind(), content_len = content.len(), "Summarizing");

    let request = CompletionRequest::new(vec![ChatMessage::user(prompt::summary_prompt(content))])
        .with_system(prompt::SUMMARY_SYSTEM_PROMPT)
        .with_max_tokens(sampling.max_tokens)
        .with_temperature(sampling.temperature);
    provider.complete(&request).await
}

/// Answer `message` about a page, given earlier turns.
///
/// `history` is sent as-is; callers trim it to the window they want.
///
/// # Errors
///
/// Provider call failures.
pub async fn chat_reply(
    provider: &dyn Provider,
    page: PageContext<'_>,
    history: &[ChatMessage],
    message: &str,
    sampling: Sampling,
) -> Result<String, ProviderError> {
    debug!(
        provider = %provider.kind(),
        history = history.len(),
        content_len = page.content.len(),
        "Chat request"
    );

    let mut messages = history.to_vec();
    messages.push(ChatMessage::user(message));
    let request = CompletionRequest::new(messages)
        .with_system(prompt::chat_system_prompt(page.title, page.url, page.content))
        .with_max_tokens(sampling.max_tokens)
        .with_temperature(sampling.temperature);
    provider.complete(&request).await
}

/// Check that the provider accepts the configured key.
///
/// Returns the provider's one-sentence summary of a fixed test text.
///
/// # Errors
///
/// Provider call failures.
pub async fn test_connection(provider: &dyn Provider) -> Result<String, ProviderError> {
    let request = CompletionRequest::new(vec![ChatMessage::user(prompt::test_prompt(
        prompt::TEST_CONTENT,
    ))])
    .with_max_tokens(50);
    provider.complete(&request).await
}
