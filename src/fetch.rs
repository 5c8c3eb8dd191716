//! Page download and the "current page" abstraction.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::dom;
use crate::encoding;
use crate::error::{Error, Result};
use crate::metadata;

/// Timeout for a page download.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

const USER_AGENT: &str = concat!("page-digest/", env!("CARGO_PKG_VERSION"));

/// Decoded HTML of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub title: Option<String>,
    pub html: String,
}

impl FetchedPage {
    /// Wrap HTML obtained elsewhere, reading the title from `<title>`.
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let doc = dom::parse(&html);
        let title = metadata::page_metadata(&doc, None).title;
        Self {
            url: url.into(),
            title,
            html,
        }
    }
}

/// Downloads pages over HTTP.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    /// GET `url` and decode the body using the response charset.
    ///
    /// # Errors
    ///
    /// [`Error::Fetch`] for a malformed URL, a transport failure or a
    /// non-success status.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = Url::parse(url).map_err(|e| Error::Fetch(format!("Invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Fetch(format!("Unsupported URL scheme: {}", parsed.scheme())));
        }

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("HTTP {} for {parsed}", status.as_u16())));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| Error::Fetch(e.to_string()))?;
        debug!(url = %final_url, bytes = bytes.len(), "Page fetched");

        let html = encoding::decode_html(&bytes, content_type.as_deref());
        Ok(FetchedPage::from_html(final_url, html))
    }
}

/// Where the front end reads the page the user is looking at.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn current_page(&self) -> Result<FetchedPage>;
}

#[async_trait]
impl PageSource for FetchedPage {
    async fn current_page(&self) -> Result<FetchedPage> {
        Ok(self.clone())
    }
}

/// A page downloaded on demand.
#[derive(Debug, Clone)]
pub struct RemotePage {
    fetcher: PageFetcher,
    url: String,
}

impl RemotePage {
    pub fn new(fetcher: PageFetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PageSource for RemotePage {
    async fn current_page(&self) -> Result<FetchedPage> {
        self.fetcher.fetch(&self.url).await
    }
}
