//! Text cleanup and measurement helpers.
//!
//! Everything here works on characters rather than bytes, so limits never
//! split a multi-byte code point.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

/// Any run of whitespace.
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RUN regex"));

/// Three or more consecutive newlines.
static NEWLINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("NEWLINE_RUN regex"));

/// Sentence terminators.
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("SENTENCE_END regex"));

/// Average reading speed used by [`reading_time_minutes`].
pub const WORDS_PER_MINUTE: usize = 200;

/// Normalize extracted text: collapse whitespace runs to a single space and trim.
#[must_use]
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// First `max_chars` characters of `text`.
#[must_use]
pub fn limit_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate `text` so that the result, suffix included, fits in `max_len` characters.
///
/// Text that already fits is returned unchanged.
#[must_use]
pub fn truncate(text: &str, max_len: usize, suffix: &str) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(suffix.chars().count());
    format!("{}{suffix}", limit_chars(text, keep))
}

/// Shorten a URL for display, ending it with `...` when cut.
#[must_use]
pub fn truncate_url(url: &str, max_len: usize) -> String {
    truncate(url, max_len, "...")
}

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Rough token estimate: one token per four characters, rounded up.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimated reading time in whole minutes.
#[must_use]
pub fn reading_time_minutes(text: &str) -> usize {
    word_count(text).div_ceil(WORDS_PER_MINUTE)
}

/// Split text into sentences, dropping fragments of ten characters or fewer.
#[must_use]
pub fn extract_sentences(text: &str) -> Vec<String> {
    SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() > 10)
        .map(ToString::to_string)
        .collect()
}

/// Put each sentence of a summary on its own paragraph.
#[must_use]
pub fn format_summary(text: &str) -> String {
    let spaced = text.replace(". ", ".\n\n");
    NEWLINE_RUN.replace_all(&spaced, "\n\n").trim().to_string()
}
