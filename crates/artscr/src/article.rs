// ABOUTME: The Article record returned by extraction, with formatting helpers.
// ABOUTME: Serializable for CLI JSON output; length counts the content's plain text.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The extracted article: cleaned content plus reconciled metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Article {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    /// Cleaned article fragment, wrapped in the page container.
    pub content: String,
    /// Plain-text length of `content` in characters.
    pub length: usize,
    pub site_name: Option<String>,
    pub language: Option<String>,
    /// Text direction, `ltr` or `rtl`.
    pub direction: Option<String>,
    pub published: Option<DateTime<FixedOffset>>,
}

impl Article {
    /// Returns true if the result has no meaningful content.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_empty()
    }

    /// Returns true if the result has a byline.
    pub fn has_byline(&self) -> bool {
        self.byline.as_ref().map_or(false, |b| !b.is_empty())
    }

    /// One-paragraph human-readable digest of the metadata.
    pub fn format_summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref title) = self.title {
            if !title.is_empty() {
                parts.push(format!("title: {}", title));
            }
        }
        if let Some(ref byline) = self.byline {
            if !byline.is_empty() {
                parts.push(format!("byline: {}", byline));
            }
        }
        if let Some(ref site) = self.site_name {
            if !site.is_empty() {
                parts.push(format!("site: {}", site));
            }
        }
        if let Some(published) = self.published {
            parts.push(format!("published: {}", published.format("%Y-%m-%d")));
        }
        parts.push(format!("length: {}", self.length));
        parts.join("\n")
    }
}

/// Count words in a text string using whitespace splitting.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
