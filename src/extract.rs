//! Main content extraction.
//!
//! Works on a private clone of the parsed page: noise elements are removed,
//! a fixed list of content selectors is tried in order, and the body is used
//! when none of them holds enough text. The result is whitespace-normalized,
//! length-limited and checked for quality before it is handed on.

use dom_query::Document;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom;
use crate::encoding;
use crate::error::{Error, Result};
use crate::metadata::{self, PageMetadata};
use crate::options::Options;
use crate::selectors::{BODY_NOISE_SELECTORS, CONTENT_SELECTORS, UNWANTED_SELECTORS};
use crate::text;

/// Where the extracted text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// A content selector matched with enough text.
    Selector(String),
    /// No selector qualified; the cleaned body was used.
    Body,
    /// The heuristic text failed validation and Readability recovered it.
    Readability,
}

/// Cleaned page text together with page metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// Cleaned, length-limited main text.
    pub content: String,

    /// Title, URL and descriptive meta tags.
    pub metadata: PageMetadata,

    /// Which strategy produced `content`.
    pub source: ContentSource,

    /// Words in `content`.
    pub word_count: usize,
}

/// Extract the main readable text of a page.
pub fn extract_page_content(html: &str, options: &Options) -> Result<String> {
    let doc = dom::parse(html);
    extract_from_document(&doc, options).map(|(content, _)| content)
}

/// Decode raw page bytes and extract the main text.
///
/// The charset comes from `content_type` when it names one, then from
/// `<meta>` tags, and defaults to UTF-8.
pub fn extract_bytes(html: &[u8], content_type: Option<&str>, options: &Options) -> Result<String> {
    let decoded = encoding::decode_html(html, content_type);
    extract_page_content(&decoded, options)
}

/// Extract main text and metadata of a page.
pub fn extract_page(html: &str, url: Option<&str>, options: &Options) -> Result<ExtractedPage> {
    let doc = dom::parse(html);
    let metadata = metadata::page_metadata(&doc, url);
    let (content, source) = extract_from_document(&doc, options)?;
    let word_count = text::word_count(&content);

    debug!(
        content_len = content.len(),
        word_count,
        source = ?source,
        "Content extracted"
    );

    Ok(ExtractedPage {
        content,
        metadata,
        source,
        word_count,
    })
}

/// Check whether cleaned text is worth summarizing.
///
/// Rejects text that is too short, has too few words, or whose words are so
/// short on average that it is most likely a menu or tag list.
#[must_use]
pub fn is_valid_content(content: &str, options: &Options) -> bool {
    if content.is_empty() || content.chars().count() < options.min_content_len {
        return false;
    }

    let words = text::word_count(content);
    if words == 0 || words < options.min_word_count {
        return false;
    }

    let letters = content.chars().filter(|c| !c.is_whitespace()).count();
    let avg_word_len = letters as f64 / words as f64;
    avg_word_len >= options.min_avg_word_len
}

fn extract_from_document(doc: &Document, options: &Options) -> Result<(String, ContentSource)> {
    // The caller's tree is never modified
    let work = dom::clone_document(doc);

    for selector in UNWANTED_SELECTORS {
        dom::remove_all(&work, selector);
    }

    let (raw, source) = select_main_text(&work, options);
    if raw.trim().is_empty() {
        debug!("No text found after noise removal");
        return recover_with_readability(doc, options).ok_or(Error::NoMeaningfulContent);
    }

    let content = finish_text(&raw, options);
    if is_valid_content(&content, options) {
        return Ok((content, source));
    }

    debug!(
        content_len = content.len(),
        "Extracted text failed validation"
    );
    recover_with_readability(doc, options).ok_or(Error::NoMeaningfulContent)
}

fn select_main_text(work: &Document, options: &Options) -> (String, ContentSource) {
    let root = work.select("html");

    for selector in CONTENT_SELECTORS {
        let Some(element) = dom::query_selector(&root, selector) else {
            continue;
        };
        let candidate = dom::inner_text(&element);
        if candidate.trim().chars().count() > options.min_candidate_len {
            debug!(selector, "Main content selector matched");
            return (candidate, ContentSource::Selector((*selector).to_string()));
        }
    }

    for selector in BODY_NOISE_SELECTORS {
        dom::remove_all(work, selector);
    }
    (dom::inner_text(&dom::body(work)), ContentSource::Body)
}

fn finish_text(raw: &str, options: &Options) -> String {
    let cleaned = text::clean_text(raw);
    text::limit_chars(&cleaned, options.max_content_len).to_string()
}

#[cfg(feature = "readability")]
fn recover_with_readability(doc: &Document, options: &Options) -> Option<(String, ContentSource)> {
    use dom_smoothie::Readability;

    if !options.use_readability_fallback {
        return None;
    }

    let mut reader = Readability::with_document(dom::clone_document(doc), None, None).ok()?;
    let article = reader.parse().ok()?;
    let article_doc = Document::from(article.content.to_string());
    let content = finish_text(&dom::inner_text(&dom::body(&article_doc)), options);

    if is_valid_content(&content, options) {
        debug!(content_len = content.len(), "Readability fallback recovered content");
        Some((content, ContentSource::Readability))
    } else {
        None
    }
}

#[cfg(not(feature = "readability"))]
fn recover_with_readability(_doc: &Document, _options: &Options) -> Option<(String, ContentSource)> {
    None
}
