// ABOUTME: Top-level extraction orchestration: metadata, primary election, retry ladder, post-process.
// ABOUTME: Owns the attempt state machine; the pristine source string is the DOM snapshot between passes.

use dom_query::{Document, NodeRef, Selection};
use log::debug;
use scraper::Html;
use serde::Serialize;

use crate::article::Article;
use crate::candidates;
use crate::dom::{self, inner_text, node_name};
use crate::error::ExtractError;
use crate::grab::{self, Attempt, CleanupFlags};
use crate::meta;
use crate::options::{ExtractorBuilder, Options};
use crate::postprocess;
use crate::prep::{self, PrepFlags};
use crate::urls::DocumentUrl;

/// What the element-based election settled on, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub path: String,
    pub content_score: f64,
    pub token_count: usize,
    pub nesting_level: usize,
}

/// The article extractor. One instance is reusable across documents;
/// every call owns its own DOM.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    opts: Options,
}

impl Extractor {
    pub fn new(opts: Options) -> Self {
        Self { opts }
    }

    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Extracts the article, or `None` when no article is found. Never
    /// fails on absence.
    pub fn try_parse(&self, html: &str) -> Option<Article> {
        self.parse(html).ok()
    }

    /// Extracts the article, failing with ArticleNotFound on absence.
    pub fn parse(&self, html: &str) -> Result<Article, ExtractError> {
        let head = Html::parse_document(html);
        let mut metadata = meta::harvest(&head);

        let document_url = self
            .opts
            .document_url
            .clone()
            .or_else(|| meta::discover_document_url(&head))
            .and_then(|raw| DocumentUrl::parse(&raw));

        // The source string after noscript reconciliation is the snapshot
        // every attempt restores from.
        let pristine = {
            let doc = Document::from(html);
            unwrap_noscript_images(&doc);
            doc.html().to_string()
        };

        if metadata.byline.is_none() {
            metadata.byline = scan_byline(&pristine);
        }

        let mut attempts: Vec<Attempt> = Vec::new();
        let mut chosen: Option<Attempt> = None;

        match self.primary_attempt(&pristine) {
            Some(attempt) if attempt.text_len >= self.opts.char_threshold => {
                chosen = Some(attempt);
            }
            Some(attempt) => {
                debug!(
                    "primary pick ran thin ({} chars), entering retry ladder",
                    attempt.text_len
                );
                attempts.push(attempt);
            }
            None => {
                debug!("no element-based candidate qualified, entering retry ladder");
            }
        }

        if chosen.is_none() {
            let ladder = [
                CleanupFlags::all(),
                CleanupFlags::WEIGHT_CLASSES | CleanupFlags::CLEAN_CONDITIONALLY,
                CleanupFlags::CLEAN_CONDITIONALLY,
                CleanupFlags::empty(),
            ];
            for flags in ladder {
                let pass = grab::extract_with_flags(&pristine, &self.opts, flags);
                if metadata.byline.is_none() {
                    metadata.byline = pass.byline;
                }
                let Some(attempt) = pass.attempt else {
                    continue;
                };
                if attempt.text_len >= self.opts.char_threshold {
                    chosen = Some(attempt);
                    break;
                }
                attempts.push(attempt);
            }
        }

        let chosen = match chosen {
            Some(attempt) => attempt,
            None => attempts
                .into_iter()
                .max_by_key(|attempt| attempt.text_len)
                .filter(|attempt| attempt.text_len > 0)
                .ok_or_else(|| ExtractError::article_not_found("parse"))?,
        };

        self.finish(chosen, metadata, document_url.as_ref(), &head)
    }

    /// Runs only the element-based election and reports the pick, for
    /// the CLI front-end.
    pub fn find_candidate(&self, html: &str) -> Result<CandidateReport, ExtractError> {
        let doc = Document::from(html);
        unwrap_noscript_images(&doc);
        let set = candidates::find_candidates(&doc, self.opts.n_top_candidates)
            .ok_or_else(|| ExtractError::article_not_found("find_candidate"))?;
        let elected = set.resolve();
        Ok(CandidateReport {
            path: elected.path(),
            content_score: elected.content_score,
            token_count: elected.token_count,
            nesting_level: elected.nesting_level(),
        })
    }

    /// Element-based pass: elect, prep, retag, wrap, measure.
    fn primary_attempt(&self, pristine: &str) -> Option<Attempt> {
        let doc = Document::from(pristine);
        let set = candidates::find_candidates(&doc, self.opts.n_top_candidates)?;
        let elected = set.resolve();
        debug!(
            "elected {} (score {:.2}, {} tokens)",
            elected.path(),
            elected.content_score,
            elected.token_count
        );

        let sel = Selection::from(elected.node.clone());
        prep::prepare_article(&sel, PrepFlags::default());

        let tag = node_name(&elected.node);
        if !matches!(tag.as_str(), "article" | "section" | "div" | "main") {
            sel.rename("div");
        }

        let html = format!(
            "<div id=\"readability-page-1\" class=\"page\">{}</div>",
            sel.html()
        );
        let text_len = inner_text(&sel).chars().count();
        Some(Attempt { html, text_len })
    }

    /// Post-processes the winning attempt and assembles the article.
    fn finish(
        &self,
        attempt: Attempt,
        metadata: meta::Metadata,
        document_url: Option<&DocumentUrl>,
        head: &Html,
    ) -> Result<Article, ExtractError> {
        let doc = Document::from(attempt.html.as_str());
        let content = doc.select("body");
        postprocess::postprocess_content(
            &content,
            document_url,
            &self.opts.classes_to_preserve,
            self.opts.keep_classes,
        );

        let text = inner_text(&content);
        let excerpt = metadata
            .excerpt
            .clone()
            .or_else(|| postprocess::derive_excerpt(&content));
        let direction = meta::detect_direction(head, &text);

        Ok(Article {
            title: metadata.title,
            byline: metadata.byline,
            excerpt,
            length: text.chars().count(),
            content: content.inner_html().to_string(),
            site_name: metadata.site_name,
            language: metadata.language,
            direction: Some(direction),
            published: metadata.published,
        })
    }
}

/// Replaces a lazy placeholder image with the real `<img>` its
/// `<noscript>` fallback carries. Noscript content parses as raw text,
/// so the fallback is reparsed as its own fragment.
fn unwrap_noscript_images(doc: &Document) {
    let noscripts: Vec<NodeRef> = doc.select("noscript").nodes().iter().cloned().collect();
    for noscript in noscripts {
        let sel = Selection::from(noscript.clone());
        let fallback_html = sel.text().to_string();
        if fallback_html.trim().is_empty() {
            continue;
        }
        let fragment = Document::from(fallback_html.as_str());
        let images = fragment.select("img");
        if images.length() != 1 {
            continue;
        }
        let Some(prev) = noscript.prev_element_sibling() else {
            continue;
        };
        if !is_single_image(&prev) {
            continue;
        }
        let img_html = images.first().html().to_string();
        Selection::from(prev).replace_with_html(img_html.as_str());
        sel.remove();
    }
}

/// An `<img>`, or an element whose only significant content is one.
fn is_single_image(node: &NodeRef) -> bool {
    if node_name(node) == "img" {
        return true;
    }
    let children = dom::element_children(node);
    children.len() == 1 && node.text().trim().is_empty() && is_single_image(&children[0])
}

fn scan_byline(pristine: &str) -> Option<String> {
    let doc = Document::from(pristine);
    for node in doc.select("body *").nodes() {
        if node.is_element() && dom::is_byline_candidate(node) {
            return Some(dom::normalize_spaces(&node.text()));
        }
    }
    None
}
