//! Front-end session: the popup side of the choreography.
//!
//! A [`Session`] reads the page snapshot and settings from storage, talks to
//! the background service only through its [`RouterHandle`], and keeps the
//! chat history for the current page.

use tracing::{debug, warn};

use crate::chat::ChatHistory;
use crate::error::{Error, Result};
use crate::fetch::PageSource;
use crate::prompt::CHAT_CONTENT_LIMIT;
use crate::provider::ProviderError;
use crate::router::{Request, RouterHandle};
use crate::storage::{Area, PageSnapshot, Store};
use crate::text;

/// Title shown when the page had none.
pub const UNTITLED_PAGE: &str = "Untitled Page";

/// Shown instead of calling a provider when no page text is available.
pub const NO_CONTENT_WARNING: &str = "\u{26a0}\u{fe0f} I couldn't extract content from this page. \
You can still ask me general questions, but for page-specific questions, try right-clicking and \
selecting \"Summarize this page\" first.";

/// Shown when the background service does not answer a ping.
pub const BACKGROUND_UNAVAILABLE: &str = "Extension background script is not responding. \
Please try refreshing the page or reloading the extension.";

const CHAT_ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

/// What the popup shows when it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupState {
    /// A stored error, shown once.
    Error(String),
    /// Stored content is waiting to be summarized.
    Loading,
    /// Nothing to do.
    Initial,
}

/// A finished summary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SummaryView {
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// Assistant-side chat message produced by [`Session::send_chat_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// The provider's answer; recorded in the history.
    Answer(String),
    /// A fixed notice; no provider call was made.
    Notice(String),
    /// The request failed; the text explains why.
    Failed(String),
}

impl ChatReply {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(t) | Self::Notice(t) | Self::Failed(t) => t,
        }
    }
}

/// Popup-side state and flows.
pub struct Session {
    router: RouterHandle,
    store: Store,
    page_source: Option<Box<dyn PageSource>>,
    history: ChatHistory,
}

impl Session {
    /// New session; chat history is restored from storage when readable.
    #[must_use]
    pub fn new(router: RouterHandle, store: Store) -> Self {
        let history = store.load_chat_history().unwrap_or_else(|e| {
            warn!(error = %e, "Could not restore chat history");
            ChatHistory::default()
        });
        Self {
            router,
            store,
            page_source: None,
            history,
        }
    }

    /// Page used for chat questions when nothing is stored yet.
    #[must_use]
    pub fn with_page_source(mut self, source: impl PageSource + 'static) -> Self {
        self.page_source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Decide the initial popup state.
    pub fn open(&self) -> Result<PopupState> {
        if let Some(message) = self.store.take_last_error()? {
            debug!(error = %message, "Found error in storage");
            return Ok(PopupState::Error(message));
        }
        let snapshot = self.store.load_snapshot()?;
        if snapshot.content().is_some() && snapshot.is_processing {
            debug!("Starting summarization process");
            return Ok(PopupState::Loading);
        }
        debug!("No content to process, showing initial state");
        Ok(PopupState::Initial)
    }

    /// Summarize the stored page.
    ///
    /// The processing flag is cleared whether or not this succeeds.
    ///
    /// # Errors
    ///
    /// Missing API key, missing content, router failures, or the error text
    /// the background service returned.
    pub async fn process_summarization(&self) -> Result<SummaryView> {
        let snapshot = self.store.load_snapshot()?;
        let result = self.summarize_snapshot(&snapshot).await;

        if let Err(e) = self.store.set_processing(false) {
            warn!(error = %e, "Failed to clear processing flag");
        }
        result
    }

    async fn summarize_snapshot(&self, snapshot: &PageSnapshot) -> Result<SummaryView> {
        let settings = self.store.load_settings()?;
        if !settings.has_api_key() {
            return Err(ProviderError::MissingApiKey.into());
        }
        let content = snapshot.content().ok_or(Error::NoContent)?;

        let response = self
            .router
            .send(Request::Summarize {
                content: content.to_string(),
                api_key: settings.api_key.clone(),
                provider: settings.provider.id().to_string(),
            })
            .await?
            .into_result("Failed to generate summary")?;

        Ok(SummaryView {
            title: snapshot
                .current_title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNTITLED_PAGE.to_string()),
            url: snapshot.current_url.clone().unwrap_or_default(),
            summary: response.summary.unwrap_or_default(),
        })
    }

    /// Summarize again from stored content. `None` when nothing is stored.
    pub async fn retry(&self) -> Result<Option<SummaryView>> {
        if self.store.load_snapshot()?.content().is_none() {
            return Ok(None);
        }
        self.process_summarization().await.map(Some)
    }

    /// Forget the current page, its chat and any stored error.
    pub fn new_summary(&mut self) -> Result<()> {
        debug!("New summary requested");
        self.history.clear();
        self.store.clear(Area::Local)
    }

    /// Ask a question about the current page.
    ///
    /// Returns `None` for blank input. Failures never escape; they come back
    /// as [`ChatReply::Failed`] with a short explanation.
    pub async fn send_chat_message(&mut self, message: &str) -> Option<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        debug!(message, "Sending chat message");

        if self.router.ping().await.is_err() {
            return Some(ChatReply::Failed(BACKGROUND_UNAVAILABLE.to_string()));
        }

        match self.chat_exchange(message).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                debug!(error = %e, "Chat error");
                Some(ChatReply::Failed(format!(
                    "{CHAT_ERROR_PREFIX}{}",
                    friendly_chat_error(&e.to_string())
                )))
            }
        }
    }

    async fn chat_exchange(&mut self, message: &str) -> Result<ChatReply> {
        let mut snapshot = self.store.load_snapshot()?;
        let settings = self.store.load_settings()?;

        if snapshot.content().is_none() {
            if let Some(extracted) = self.extract_current_page().await {
                snapshot = extracted;
            }
        }

        debug!(
            has_content = snapshot.content().is_some(),
            content_len = snapshot.content().map_or(0, str::len),
            has_api_key = settings.has_api_key(),
            provider = %settings.provider,
            "Chat data retrieved"
        );

        if !settings.has_api_key() {
            return Err(ProviderError::MissingApiKey.into());
        }
        let Some(content) = snapshot.content() else {
            debug!("Warning: no page content available");
            return Ok(ChatReply::Notice(NO_CONTENT_WARNING.to_string()));
        };

        let response = self
            .router
            .send(Request::Chat {
                message: message.to_string(),
                chat_history: self.history.window().to_vec(),
                page_content: text::limit_chars(content, CHAT_CONTENT_LIMIT).to_string(),
                page_url: snapshot.current_url.clone(),
                page_title: snapshot.current_title.clone(),
                api_key: settings.api_key.clone(),
                provider: settings.provider.id().to_string(),
            })
            .await?
            .into_result("Failed to get chat response")?;

        let reply = response.reply.unwrap_or_default();
        self.history.push_exchange(message, reply.clone());
        if let Err(e) = self.store.save_chat_history(&self.history) {
            warn!(error = %e, "Failed to save chat history");
        }
        debug!("Chat message sent successfully");
        Ok(ChatReply::Answer(reply))
    }

    /// Extract the attached page through the router and store it.
    ///
    /// Failures are logged and yield `None`; chat continues without content.
    async fn extract_current_page(&self) -> Option<PageSnapshot> {
        let source = self.page_source.as_ref()?;
        debug!("No stored content found, extracting from current page");

        let page = match source.current_page().await {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "Failed to load current page");
                return None;
            }
        };
        let response = self
            .router
            .send(Request::ExtractContent {
                html: page.html,
                url: Some(page.url.clone()),
                title: page.title.clone(),
            })
            .await;

        let content = match response {
            Ok(r) if r.success => r.content.filter(|c| !c.trim().is_empty())?,
            Ok(r) => {
                debug!(error = ?r.error, "Failed to extract content");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "Failed to extract content");
                return None;
            }
        };

        let snapshot = PageSnapshot::new(content, Some(page.url), page.title);
        if let Err(e) = self.store.save_snapshot(&snapshot) {
            warn!(error = %e, "Failed to store extracted content");
        }
        debug!(content_len = snapshot.content().map_or(0, str::len), "Content extracted successfully");
        Some(snapshot)
    }

    /// Drop the conversation.
    pub fn clear_chat(&mut self) -> Result<()> {
        self.history.clear();
        self.store.save_chat_history(&self.history)
    }
}

/// Replace common failure messages with advice the user can act on.
#[must_use]
pub fn friendly_chat_error(message: &str) -> String {
    let lower = message.to_lowercase();
    let friendly = if lower.contains("timed out") {
        "The request timed out. Please try again with a shorter message or check your internet connection."
    } else if lower.contains("api key") {
        "There's an issue with your API key. Please check your settings and make sure your API key is valid."
    } else if lower.contains("rate limit") {
        "You've hit the rate limit. Please wait a moment and try again."
    } else if lower.contains("network") || lower.contains("fetch") {
        "Network error. Please check your internet connection and try again."
    } else {
        return message.to_string();
    };
    friendly.to_string()
}
