//! Character encoding detection and transcoding.
//!
//! Fetched pages arrive as bytes. The charset is taken from the HTTP
//! `Content-Type` header when the server sent one, then from the document's
//! own `<meta>` declarations, and finally defaults to UTF-8.

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::sync::LazyLock;

/// `charset=` parameter inside a Content-Type value (header or meta).
#[allow(clippy::expect_used)]
static CHARSET_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([^"';\s>]+)"#).expect("valid regex")
});

/// `<meta charset="...">` or `<meta http-equiv="Content-Type" content="...; charset=...">`
#[allow(clippy::expect_used)]
static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s;>]+)"#).expect("valid regex")
});

/// Bytes of the document head that are scanned for a meta declaration.
const META_SCAN_LIMIT: usize = 1024;

/// Charset label from a Content-Type header value.
#[must_use]
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    CHARSET_PARAM_RE
        .captures(content_type)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_str().as_bytes()))
}

/// Charset declared by a `<meta>` tag in the first kilobyte of the document.
#[must_use]
pub fn charset_from_meta(html: &[u8]) -> Option<&'static Encoding> {
    let head = &html[..html.len().min(META_SCAN_LIMIT)];
    let head_str = String::from_utf8_lossy(head);
    META_CHARSET_RE
        .captures(&head_str)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_str().as_bytes()))
}

/// Pick the encoding for a page: header first, then meta tags, then UTF-8.
#[must_use]
pub fn detect_encoding(html: &[u8], content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(html))
        .unwrap_or(UTF_8)
}

/// Decode page bytes to a UTF-8 string.
///
/// Invalid sequences become U+FFFD rather than errors.
///
/// # Examples
///
/// ```
/// use page_digest::encoding::decode_html;
///
/// let html = b"<html><body>Caf\xE9</body></html>";
/// let text = decode_html(html, Some("text/html; charset=ISO-8859-1"));
/// assert!(text.contains("Café"));
/// ```
#[must_use]
pub fn decode_html(html: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect_encoding(html, content_type);
    if encoding == UTF_8 {
        return String::from_utf8_lossy(html).into_owned();
    }
    let (decoded, _encoding_used, _had_errors) = encoding.decode(html);
    decoded.into_owned()
}
