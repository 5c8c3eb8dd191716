//! Page metadata from `<title>` and `<meta>` tags.

use dom_query::Document;
use serde::{Deserialize, Serialize};

use crate::dom;

/// Descriptive metadata about a page.
///
/// All fields are optional as metadata may not be present in all documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Document title.
    pub title: Option<String>,

    /// URL the page was loaded from.
    pub url: Option<String>,

    /// `description` meta content.
    pub description: Option<String>,

    /// `keywords` meta content.
    pub keywords: Option<String>,

    /// `author` meta content.
    pub author: Option<String>,

    /// `article:published_time`, falling back to `date`.
    pub publish_date: Option<String>,
}

/// Content of the first `<meta>` whose `name` or `property` equals `name`.
#[must_use]
pub fn meta_content(doc: &Document, name: &str) -> Option<String> {
    let selector = format!(r#"meta[name="{name}"], meta[property="{name}"]"#);
    dom::query_selector(&doc.select("html"), &selector)
        .and_then(|meta| dom::get_attribute(&meta, "content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Gather metadata for a parsed page.
#[must_use]
pub fn page_metadata(doc: &Document, url: Option<&str>) -> PageMetadata {
    let title = dom::query_selector(&doc.select("html"), "title")
        .map(|t| dom::text_content(&t).trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| meta_content(doc, "og:title"));

    PageMetadata {
        title,
        url: url
            .map(ToString::to_string)
            .or_else(|| meta_content(doc, "og:url")),
        description: meta_content(doc, "description"),
        keywords: meta_content(doc, "keywords"),
        author: meta_content(doc, "author"),
        publish_date: meta_content(doc, "article:published_time")
            .or_else(|| meta_content(doc, "date")),
    }
}
