//! Conversation history for questions about a page.

use serde::{Deserialize, Serialize};

use crate::provider::ChatMessage;

/// Messages sent along with each chat request.
pub const HISTORY_WINDOW: usize = 6;

/// Ordered user/assistant messages, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a question and its answer.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
    }

    /// The last `n` messages, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// The messages sent with the next request.
    #[must_use]
    pub fn window(&self) -> &[ChatMessage] {
        self.recent(HISTORY_WINDOW)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

impl From<Vec<ChatMessage>> for ChatHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;

    #[test]
    fn window_keeps_last_six() {
        let mut history = ChatHistory::new();
        for i in 0..5 {
            history.push_exchange(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(history.len(), 10);

        let window = history.window();
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "q2");
        assert_eq!(window[0].role, Role::User);
        assert_eq!(window[5].content, "a4");
    }

    #[test]
    fn recent_larger_than_history() {
        let mut history = ChatHistory::new();
        history.push_exchange("q", "a");
        assert_eq!(history.recent(10).len(), 2);
        assert!(ChatHistory::new().recent(6).is_empty());
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut history = ChatHistory::new();
        history.push_exchange("Hello", "Hi there");

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Hi there"}
            ])
        );
        let back: ChatHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn clear_empties() {
        let mut history = ChatHistory::new();
        history.push_exchange("q", "a");
        history.clear();
        assert!(history.is_empty());
    }
}
