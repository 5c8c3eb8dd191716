//! CSS selector lists driving content extraction.
//!
//! Order matters in [`CONTENT_SELECTORS`]: earlier entries are preferred.

/// Elements removed before any content lookup.
pub static UNWANTED_SELECTORS: &[&str] = &[
    "script",
    "style",
    "nav",
    "header",
    "footer",
    "aside",
    ".advertisement",
    ".ads",
    ".sidebar",
    ".menu",
    ".navigation",
    ".social-share",
    ".comments",
    ".related-posts",
    ".popup",
    r#"[role="banner"]"#,
    r#"[role="navigation"]"#,
    r#"[role="complementary"]"#,
];

/// Main-content candidates, most specific first.
pub static CONTENT_SELECTORS: &[&str] = &[
    "article",
    r#"[role="main"]"#,
    "main",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".content-body",
    ".story-body",
    "#content",
    ".main-content",
    ".page-content",
];

/// Extra noise stripped only when falling back to the whole body.
pub static BODY_NOISE_SELECTORS: &[&str] = &[
    ".cookie-notice",
    ".newsletter",
    ".subscription",
    ".social-media",
    ".breadcrumb",
    ".tags",
    ".categories",
    ".metadata",
    ".author-bio",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    #[test]
    fn all_selectors_parse() {
        let doc = dom::parse("<html><body><p>x</p></body></html>");
        for selector in UNWANTED_SELECTORS
            .iter()
            .chain(CONTENT_SELECTORS)
            .chain(BODY_NOISE_SELECTORS)
        {
            // dom_query yields an empty selection for an invalid selector;
            // matching against a document with none of these must not panic.
            assert!(doc.select(selector).is_empty(), "{selector} matched unexpectedly");
        }
    }

    #[test]
    fn article_is_preferred_candidate() {
        assert_eq!(CONTENT_SELECTORS.first(), Some(&"article"));
        assert!(!CONTENT_SELECTORS.contains(&"body"));
    }
}
