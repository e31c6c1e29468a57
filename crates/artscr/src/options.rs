// ABOUTME: Extraction configuration: Options plus the fluent ExtractorBuilder.
// ABOUTME: Defaults follow the library contract (5 top candidates, 500-char threshold).

use crate::extractor::Extractor;

/// Configuration options for an [`Extractor`].
#[derive(Debug, Clone)]
pub struct Options {
    /// How many top-scoring candidates the election retains.
    pub n_top_candidates: usize,
    /// Minimum prepped text length before the retry ladder engages.
    pub char_threshold: usize,
    /// Class names kept on output elements besides `page`.
    pub classes_to_preserve: Vec<String>,
    /// Keep all class attributes instead of stripping to the preserved set.
    pub keep_classes: bool,
    /// Absolute URL of the document; discovered from the head when absent.
    pub document_url: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            n_top_candidates: 5,
            char_threshold: 500,
            classes_to_preserve: vec!["caption".to_string()],
            keep_classes: false,
            document_url: None,
        }
    }
}

/// Builder for constructing [`Extractor`] instances with custom settings.
#[derive(Debug, Clone, Default)]
pub struct ExtractorBuilder {
    opts: Options,
}

impl ExtractorBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many top candidates the election retains.
    pub fn n_top_candidates(mut self, n: usize) -> Self {
        self.opts.n_top_candidates = n.max(1);
        self
    }

    /// Set the retry character threshold.
    pub fn char_threshold(mut self, chars: usize) -> Self {
        self.opts.char_threshold = chars;
        self
    }

    /// Add a class name to preserve on output elements.
    pub fn preserve_class(mut self, class: impl Into<String>) -> Self {
        self.opts.classes_to_preserve.push(class.into());
        self
    }

    /// Keep every class attribute on output elements.
    pub fn keep_classes(mut self, keep: bool) -> Self {
        self.opts.keep_classes = keep;
        self
    }

    /// Provide the document's absolute URL.
    pub fn document_url(mut self, url: impl Into<String>) -> Self {
        self.opts.document_url = Some(url.into());
        self
    }

    /// Build the Extractor with the configured options.
    pub fn build(self) -> Extractor {
        Extractor::new(self.opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.n_top_candidates, 5);
        assert_eq!(opts.char_threshold, 500);
        assert_eq!(opts.classes_to_preserve, vec!["caption".to_string()]);
        assert!(!opts.keep_classes);
        assert!(opts.document_url.is_none());
    }

    #[test]
    fn test_builder_floor_on_top_candidates() {
        let extractor = ExtractorBuilder::new().n_top_candidates(0).build();
        assert_eq!(extractor.options().n_top_candidates, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let extractor = ExtractorBuilder::new()
            .char_threshold(120)
            .preserve_class("figure")
            .keep_classes(true)
            .document_url("https://example.com/a")
            .build();
        let opts = extractor.options();
        assert_eq!(opts.char_threshold, 120);
        assert!(opts.classes_to_preserve.contains(&"figure".to_string()));
        assert!(opts.keep_classes);
        assert_eq!(opts.document_url.as_deref(), Some("https://example.com/a"));
    }
}
