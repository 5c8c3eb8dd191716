//! DOM Operations Adapter
//!
//! Thin layer over the `dom_query` crate giving the extraction pipeline
//! browser-style operations: `querySelector`, element removal, document
//! cloning and an `innerText`-like text rendering.

// Re-export core types for external use
pub use dom_query::{Document, NodeRef, Selection};

pub use tendril::StrTendril;

/// Tags whose boundaries separate lines when rendering text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Tags whose text is never rendered.
const NON_RENDERED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

// === Parsing ===

/// Parse HTML string into document
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Clone document
///
/// The clone is re-parsed from serialized HTML, so edits to it never reach
/// the original tree.
pub fn clone_document(doc: &Document) -> Document {
    Document::from(doc.html().to_string())
}

// === Attribute Information ===

/// Get any attribute value
#[inline]
#[must_use]
pub fn get_attribute(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name).map(|s| s.to_string())
}

// === Querying ===

/// Query first element matching a CSS selector, if any
#[must_use]
pub fn query_selector<'a>(sel: &Selection<'a>, selector: &str) -> Option<Selection<'a>> {
    let found = sel.select_single(selector);
    found.exists().then_some(found)
}

/// The document `<body>`, or the root when the parser produced none
#[must_use]
pub fn body(doc: &Document) -> Selection<'_> {
    let body = doc.select("body");
    if body.exists() {
        body
    } else {
        doc.select("html")
    }
}

// === Tree Manipulation ===

/// Remove every element matching `selector`, returning how many were removed.
pub fn remove_all(doc: &Document, selector: &str) -> usize {
    let matches = doc.select(selector);
    let count = matches.length();
    if count > 0 {
        matches.remove();
    }
    count
}

// === Text Content ===

/// Get all text content of node and descendants, including hidden text
///
/// Equivalent of DOM `textContent`.
#[inline]
#[must_use]
pub fn text_content(sel: &Selection) -> StrTendril {
    sel.text()
}

/// Render text roughly the way `innerText` does
///
/// Script and style contents are skipped and block-level boundaries become
/// line breaks, so words from adjacent paragraphs never run together.
#[must_use]
pub fn inner_text(sel: &Selection) -> String {
    let mut out = String::new();
    for node in sel.nodes() {
        push_node_text(node, &mut out);
    }
    out
}

fn push_node_text(node: &NodeRef, out: &mut String) {
    if node.is_text() {
        out.push_str(&node.text());
        return;
    }

    let name = node.node_name().map(|t| t.to_ascii_lowercase());
    let name = name.as_deref().unwrap_or_default();
    if NON_RENDERED_ELEMENTS.contains(&name) {
        return;
    }

    let is_block = BLOCK_ELEMENTS.contains(&name);
    if is_block {
        out.push('\n');
    }
    for child in node.children() {
        push_node_text(&child, out);
    }
    if is_block {
        out.push('\n');
    }
}
