// ABOUTME: Main library entry point for the ArtScr article extractor.
// ABOUTME: Re-exports the public API: Extractor, ExtractorBuilder, Article, ExtractError, Options.

//! ArtScr - extracts the primary readable article from an HTML page.
//!
//! This crate identifies, among thousands of nested elements, the subtree
//! carrying the article, cleans it up for presentation, and reconciles
//! title, byline, excerpt, site name, language, direction, and
//! publication time from JSON-LD, meta tags, and the document title.
//!
//! # Example
//!
//! ```
//! use artscr::Extractor;
//!
//! let html = r#"
//! <html><head><title>A Fairly Long Example Title - Example</title></head>
//! <body><article>
//!   <p>Article body text, with commas, and enough words to matter for
//!   the scorer across repeated paragraphs of real content.</p>
//!   <p>Article body text, with commas, and enough words to matter for
//!   the scorer across repeated paragraphs of real content.</p>
//! </article></body></html>
//! "#;
//!
//! let extractor = Extractor::builder().char_threshold(100).build();
//! if let Some(article) = extractor.try_parse(html) {
//!     println!("{}", article.format_summary());
//! }
//! ```

pub mod article;
pub mod candidates;
pub mod dom;
pub mod error;
pub mod extractor;
pub mod grab;
pub mod meta;
pub mod options;
pub mod postprocess;
pub mod prep;
pub mod tokens;
pub mod urls;

pub use crate::article::Article;
pub use crate::error::{ErrorCode, ExtractError};
pub use crate::extractor::{CandidateReport, Extractor};
pub use crate::meta::Metadata;
pub use crate::options::{ExtractorBuilder, Options};
pub use crate::urls::{DataUrl, DocumentUrl};
