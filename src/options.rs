//! Configuration options for content extraction.
//!
//! `Options` holds the thresholds that decide when a candidate element is
//! accepted as main content and when the final text is considered
//! meaningful enough to send to a provider.

/// Configuration options for content extraction.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use page_digest::Options;
///
/// let options = Options {
///     max_content_len: 8_000,
///     ..Options::default()
/// };
/// assert_eq!(options.min_candidate_len, 200);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Minimum trimmed text length (characters) a content-selector match
    /// needs before it is accepted as the main content.
    ///
    /// Default: `200`
    pub min_candidate_len: usize,

    /// Minimum length (characters) of the cleaned output.
    ///
    /// Default: `100`
    pub min_content_len: usize,

    /// Minimum number of whitespace-separated words in the cleaned output.
    ///
    /// Default: `50`
    pub min_word_count: usize,

    /// Minimum average word length (non-space characters per word).
    ///
    /// Menus and tag clouds made of short repeated phrases fall below this.
    ///
    /// Default: `3.0`
    pub min_avg_word_len: f64,

    /// Maximum length (characters) of the cleaned output.
    ///
    /// Default: `16000`
    pub max_content_len: usize,

    /// Try a Readability pass when the heuristic result fails validation.
    ///
    /// Requires the `readability` feature flag.
    ///
    /// Default: `true`
    pub use_readability_fallback: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            min_candidate_len: 200,
            min_content_len: 100,
            min_word_count: 50,
            min_avg_word_len: 3.0,
            max_content_len: 16_000,
            use_readability_fallback: true,
        }
    }
}

impl Options {
    /// Options with every quality gate disabled.
    ///
    /// Used when any text is better than none, e.g. extracting content for
    /// a chat question about a sparse page.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            min_content_len: 1,
            min_word_count: 1,
            min_avg_word_len: 0.0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_thresholds() {
        let opts = Options::default();

        assert_eq!(opts.min_candidate_len, 200);
        assert_eq!(opts.min_content_len, 100);
        assert_eq!(opts.min_word_count, 50);
        assert!((opts.min_avg_word_len - 3.0).abs() < f64::EPSILON);
        assert_eq!(opts.max_content_len, 16_000);
        assert!(opts.use_readability_fallback);
    }

    #[test]
    fn test_lenient_keeps_length_limit() {
        let opts = Options::lenient();

        assert_eq!(opts.min_word_count, 1);
        assert_eq!(opts.max_content_len, 16_000);
        assert_eq!(opts.min_candidate_len, 200);
    }

    #[test]
    fn test_custom_thresholds() {
        let opts = Options {
            max_content_len: 500,
            use_readability_fallback: false,
            ..Options::default()
        };

        assert_eq!(opts.max_content_len, 500);
        assert!(!opts.use_readability_fallback);
        assert_eq!(opts.min_word_count, 50);
    }
}
