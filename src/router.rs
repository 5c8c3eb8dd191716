//! Background service and the message router in front of it.
//!
//! Front ends never call providers directly. They send a [`Request`] through
//! a [`RouterHandle`]; the background task answers each one with a
//! [`Response`] on a oneshot channel. Requests are handled concurrently, and
//! the handle gives up after a fixed timeout.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::assistant::{self, PageContext, Sampling};
use crate::chat::HISTORY_WINDOW;
use crate::error::{Error, Result};
use crate::extract;
use crate::fetch::FetchedPage;
use crate::options::Options;
use crate::provider::{self, ChatMessage, Endpoints, ProviderError, ProviderKind};
use crate::storage::{DebugInfo, PageSnapshot, Store};

/// How long a front end waits for the background service.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CHANNEL_CAPACITY: usize = 32;

/// A message for the background service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    Summarize {
        content: String,
        api_key: String,
        #[serde(default = "default_provider")]
        provider: String,
    },
    Chat {
        message: String,
        #[serde(default)]
        chat_history: Vec<ChatMessage>,
        #[serde(default)]
        page_content: String,
        page_url: Option<String>,
        page_title: Option<String>,
        api_key: String,
        #[serde(default = "default_provider")]
        provider: String,
    },
    ExtractContent {
        html: String,
        url: Option<String>,
        title: Option<String>,
    },
    GetDebugInfo,
    Ping,
}

fn default_provider() -> String {
    ProviderKind::default().id().to_string()
}

impl Request {
    fn action(&self) -> &'static str {
        match self {
            Self::Summarize { .. } => "summarize",
            Self::Chat { .. } => "chat",
            Self::ExtractContent { .. } => "extractContent",
            Self::GetDebugInfo => "getDebugInfo",
            Self::Ping => "ping",
        }
    }
}

/// Reply to a [`Request`].
///
/// Only the field matching the request is set on success; `error` is set
/// when `success` is false.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Turn `success: false` into [`Error::Remote`].
    ///
    /// `fallback` is used when the response carries no message.
    pub fn into_result(self, fallback: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::Remote(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

/// Status indicator shown by the background service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Badge {
    #[default]
    Idle,
    Processing,
    Error,
}

impl Badge {
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Processing => "...",
            Self::Error => "!",
        }
    }
}

/// The background service: owns storage access and all provider calls.
#[derive(Debug)]
pub struct Background {
    store: Store,
    endpoints: Endpoints,
    options: Options,
    badge: Mutex<Badge>,
}

impl Background {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store,
            endpoints: Endpoints::default(),
            options: Options::default(),
            badge: Mutex::new(Badge::Idle),
        }
    }

    /// Send provider calls to other hosts.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn badge(&self) -> Badge {
        *self.badge.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_badge(&self, badge: Badge) {
        *self.badge.lock().unwrap_or_else(PoisonError::into_inner) = badge;
    }

    /// Start the service, returning a handle to reach it.
    ///
    /// The task ends when every handle has been dropped. The service itself
    /// stays reachable through `self` for the badge and page actions.
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> RouterHandle {
        let (tx, mut rx) = mpsc::channel::<(Request, oneshot::Sender<Response>)>(CHANNEL_CAPACITY);
        let service = Arc::clone(self);

        tokio::spawn(async move {
            while let Some((request, reply_to)) = rx.recv().await {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let response = service.handle(request).await;
                    if reply_to.send(response).is_err() {
                        debug!("Requester went away before the response was ready");
                    }
                });
            }
            debug!("Background service stopped");
        });

        RouterHandle {
            tx,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Answer one request.
    pub async fn handle(&self, request: Request) -> Response {
        debug!(action = request.action(), "Received request");
        match request {
            Request::Summarize {
                content,
                api_key,
                provider,
            } => self.handle_summarize(&content, &api_key, &provider).await,
            Request::Chat {
                message,
                chat_history,
                page_content,
                page_url,
                page_title,
                api_key,
                provider,
            } => {
                let page = PageContext {
                    title: page_title.as_deref(),
                    url: page_url.as_deref(),
                    content: &page_content,
                };
                self.handle_chat(&message, &chat_history, page, &api_key, &provider)
                    .await
            }
            Request::ExtractContent { html, url, title } => {
                debug!(url = url.as_deref().unwrap_or(""), title = title.as_deref().unwrap_or(""), "Extracting content");
                match extract::extract_page_content(&html, &self.options) {
                    Ok(content) => Response {
                        content: Some(content),
                        ..Response::ok()
                    },
                    Err(e) => Response::failure(e.to_string()),
                }
            }
            Request::GetDebugInfo => match self.store.debug_info() {
                Ok(info) => Response {
                    debug_info: Some(info),
                    ..Response::ok()
                },
                Err(e) => Response::failure(e.to_string()),
            },
            Request::Ping => Response::ok(),
        }
    }

    async fn handle_summarize(&self, content: &str, api_key: &str, provider: &str) -> Response {
        debug!(content_len = content.len(), provider, has_api_key = !api_key.is_empty(), "Summarization request");

        let result: std::result::Result<String, ProviderError> = async {
            let kind: ProviderKind = provider.parse()?;
            let adapter = provider::build_provider_at(kind, api_key, &self.endpoints)?;
            assistant::summarize(adapter.as_ref(), content, self.sampling()).await
        }
        .await;

        match result {
            Ok(summary) => {
                debug!(summary_len = summary.len(), "Summarization successful");
                self.set_badge(Badge::Idle);
                Response {
                    summary: Some(summary),
                    ..Response::ok()
                }
            }
            Err(e) => {
                warn!(error = %e, "Summarization failed");
                self.set_badge(Badge::Error);
                Response::failure(e.friendly_message())
            }
        }
    }

    async fn handle_chat(
        &self,
        message: &str,
        history: &[ChatMessage],
        page: PageContext<'_>,
        api_key: &str,
        provider: &str,
    ) -> Response {
        if message.trim().is_empty() {
            return Response::failure("Message is empty");
        }

        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let result: std::result::Result<String, ProviderError> = async {
            let kind: ProviderKind = provider.parse()?;
            let adapter = provider::build_provider_at(kind, api_key, &self.endpoints)?;
            assistant::chat_reply(adapter.as_ref(), page, &history[start..], message, self.sampling())
                .await
        }
        .await;

        match result {
            Ok(reply) => Response {
                reply: Some(reply),
                ..Response::ok()
            },
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                Response::failure(e.friendly_message())
            }
        }
    }

    /// Sampling from stored settings, or the defaults when they cannot be read.
    fn sampling(&self) -> Sampling {
        match self.store.load_stored_settings() {
            Ok(settings) => Sampling {
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
            },
            Err(e) => {
                warn!(error = %e, "Failed to read settings, using default sampling");
                Sampling::default()
            }
        }
    }

    /// "Summarize this page" entry point.
    ///
    /// Extracts the page and stores it for the front end with the processing
    /// flag set. Nothing is summarized here. Failures are stored as
    /// `lastError` and flagged on the badge.
    ///
    /// # Errors
    ///
    /// The extraction error, after it has been recorded, or a storage error.
    pub fn summarize_page_action(&self, page: &FetchedPage) -> Result<()> {
        debug!(url = %page.url, "Summarize page action");

        let options = Options {
            max_content_len: self.options.max_content_len,
            use_readability_fallback: self.options.use_readability_fallback,
            ..Options::lenient()
        };
        let content = match extract::extract_page_content(&page.html, &options) {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) | Err(Error::NoContent | Error::NoMeaningfulContent) => {
                debug!("No content extracted, showing error badge");
                return self.fail_page_action(Error::NoContent);
            }
            Err(e) => return self.fail_page_action(e),
        };

        let snapshot = PageSnapshot {
            is_processing: true,
            ..PageSnapshot::new(content, Some(page.url.clone()), page.title.clone())
        };
        self.store.save_snapshot(&snapshot)?;
        self.set_badge(Badge::Processing);
        debug!("Content stored, ready for summarization");
        Ok(())
    }

    fn fail_page_action(&self, error: Error) -> Result<()> {
        self.set_badge(Badge::Error);
        self.store.record_error(&error.to_string())?;
        Err(error)
    }
}

/// Cheap, cloneable sender to the background service.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<(Request, oneshot::Sender<Response>)>,
    timeout: Duration,
}

impl RouterHandle {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnected`] when the service is gone, [`Error::Timeout`]
    /// when it does not answer in time, [`Error::NoResponse`] when it
    /// dropped the request.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| Error::Disconnected)?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::NoResponse),
            Err(_) => Err(Error::Timeout),
        }
    }

    /// Check the service is alive.
    pub async fn ping(&self) -> Result<()> {
        self.send(Request::Ping).await?.into_result("Ping failed").map(|_| ())
    }

    /// A handle whose service replies through `responder`.
    ///
    /// Lets tests script the background side.
    #[must_use]
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(Request) -> Option<Response> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<(Request, oneshot::Sender<Response>)>(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some((request, reply_to)) = rx.recv().await {
                if let Some(response) = responder(request) {
                    let _ = reply_to.send(response);
                }
            }
        });
        Self {
            tx,
            timeout: REQUEST_TIMEOUT,
        }
    }
}
