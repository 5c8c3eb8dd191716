//! Prompt text sent to the providers.

use crate::text;

/// Instructions for page summaries.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that creates concise, \
informative summaries of web page content. Focus on the main points and key information. \
Keep summaries between 3-5 sentences.";

/// Text summarized by the connection test.
pub const TEST_CONTENT: &str =
    "This is a test message to verify the API connection is working properly.";

/// Page content beyond this many characters is not sent with chat questions.
pub const CHAT_CONTENT_LIMIT: usize = 8_000;

/// User turn asking for a summary of `content`.
#[must_use]
pub fn summary_prompt(content: &str) -> String {
    format!("Please summarize the following webpage content:\n\n{content}")
}

/// User turn for the connection test.
#[must_use]
pub fn test_prompt(content: &str) -> String {
    format!("Summarize this in one sentence: {content}")
}

/// System prompt for questions about a page.
///
/// Missing title or URL are rendered as "Unknown". Content is cut to
/// [`CHAT_CONTENT_LIMIT`] characters.
#[must_use]
pub fn chat_system_prompt(title: Option<&str>, url: Option<&str>, content: &str) -> String {
    let title = title.filter(|t| !t.trim().is_empty()).unwrap_or("Unknown");
    let url = url.filter(|u| !u.trim().is_empty()).unwrap_or("Unknown");
    let content = text::limit_chars(content, CHAT_CONTENT_LIMIT);

    let mut prompt = format!(
        "You are a helpful assistant answering questions about a web page.\n\
         Page title: {title}\n\
         Page URL: {url}\n\n"
    );
    if content.trim().is_empty() {
        prompt.push_str(
            "No page content is available. Answer general questions as best you can and say \
             so when a question needs the page itself.",
        );
    } else {
        prompt.push_str(
            "Answer using the page content below. If the answer is not in the content, say so \
             briefly before giving any general knowledge.\n\n--- PAGE CONTENT ---\n",
        );
        prompt.push_str(content);
        prompt.push_str("\n--- END PAGE CONTENT ---");
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_embeds_content() {
        assert_eq!(
            summary_prompt("Body text"),
            "Please summarize the following webpage content:\n\nBody text"
        );
    }

    #[test]
    fn chat_prompt_includes_page_details() {
        let prompt = chat_system_prompt(Some("Rust News"), Some("https://example.com"), "Crate released.");
        assert!(prompt.contains("Page title: Rust News"));
        assert!(prompt.contains("Page URL: https://example.com"));
        assert!(prompt.contains("Crate released."));
    }

    #[test]
    fn chat_prompt_limits_content() {
        let content = "x".repeat(CHAT_CONTENT_LIMIT + 500);
        let prompt = chat_system_prompt(None, None, &content);
        assert_eq!(prompt.matches('x').count(), CHAT_CONTENT_LIMIT);
        assert!(prompt.contains("Page title: Unknown"));
    }

    #[test]
    fn chat_prompt_without_content() {
        let prompt = chat_system_prompt(Some("T"), None, "  ");
        assert!(prompt.contains("No page content is available"));
        assert!(!prompt.contains("PAGE CONTENT"));
    }
}
