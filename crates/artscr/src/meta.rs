// ABOUTME: Metadata harvest reconciling JSON-LD, meta tags, and the document title.
// ABOUTME: Verbosity rules pick among competing meta values; Jaro-Winkler breaks headline ties.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::dom::normalize_spaces;
use crate::tokens::similarity;

/// Reconciled document metadata prior to content election.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published: Option<DateTime<FixedOffset>>,
    pub language: Option<String>,
}

/// Fields a JSON-LD article block can contribute.
#[derive(Debug, Clone, Default, PartialEq)]
struct JsonLd {
    name: Option<String>,
    headline: Option<String>,
    author: Option<String>,
    description: Option<String>,
    publisher: Option<String>,
    creator: Option<String>,
    date_published: Option<String>,
}

static ARTICLE_TYPES: &[&str] = &[
    "Article",
    "AdvertiserContentArticle",
    "NewsArticle",
    "AnalysisNewsArticle",
    "AskPublicNewsArticle",
    "BackgroundNewsArticle",
    "OpinionNewsArticle",
    "ReportageNewsArticle",
    "ReviewNewsArticle",
    "Report",
    "SatiricalArticle",
    "ScholarlyArticle",
    "MedicalScholarlyArticle",
    "SocialMediaPosting",
    "BlogPosting",
    "LiveBlogPosting",
    "DiscussionForumPosting",
    "TechArticle",
    "APIReference",
];

const TITLE_KEYS: &[&str] = &[
    "dc:title",
    "dcterm:title",
    "og:title",
    "twitter:title",
    "weibo:article:title",
    "weibo:webpage:title",
    "title",
];

const DESCRIPTION_KEYS: &[&str] = &[
    "dc:description",
    "dcterm:description",
    "og:description",
    "twitter:description",
    "weibo:article:description",
    "weibo:webpage:description",
    "description",
];

const AUTHOR_KEYS: &[&str] = &["dc:creator", "dcterm:creator", "author"];

const SITE_NAME_KEYS: &[&str] = &["og:site_name"];

const PUBLISHED_KEYS: &[&str] = &[
    "article:published_time",
    "parsely-pub-date",
    "article:modified_time",
];

static HIERARCHICAL_SEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" [\|\-\\/>»–—] ").unwrap());

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Harvests and merges metadata from the parsed head. JSON-LD wins over
/// meta tags; meta tags compete by verbosity.
pub fn harvest(doc: &Html) -> Metadata {
    let meta_values = collect_meta_values(doc);
    let json_ld = harvest_json_ld(doc);
    let html_title = document_title(doc);

    let meta_title = most_verbose(&meta_values, TITLE_KEYS);
    let title = json_ld
        .as_ref()
        .and_then(|ld| reconcile_ld_title(ld, html_title.as_deref(), meta_title.as_deref()))
        .or_else(|| html_title.clone())
        .or(meta_title);

    let byline = json_ld
        .as_ref()
        .and_then(|ld| ld.author.clone())
        .or_else(|| most_verbose(&meta_values, AUTHOR_KEYS));

    let excerpt = json_ld
        .as_ref()
        .and_then(|ld| ld.description.clone())
        .or_else(|| most_verbose(&meta_values, DESCRIPTION_KEYS));

    let site_name = json_ld
        .as_ref()
        .and_then(|ld| match (&ld.publisher, &ld.creator) {
            (Some(publisher), _) => Some(publisher.clone()),
            (None, Some(creator)) => Some(creator.clone()),
            (None, None) => None,
        })
        .or_else(|| most_verbose(&meta_values, SITE_NAME_KEYS));

    let published = json_ld
        .as_ref()
        .and_then(|ld| ld.date_published.clone())
        .or_else(|| most_verbose(&meta_values, PUBLISHED_KEYS))
        .and_then(|raw| parse_date(&raw));

    Metadata {
        title,
        byline,
        excerpt,
        site_name,
        published,
        language: detect_language(doc, &meta_values),
    }
}

/// The document URL from `<link rel="canonical">` in the head, else
/// `<meta property="og:url">`.
pub fn discover_document_url(doc: &Html) -> Option<String> {
    let canonical = selector("head link[rel='canonical']");
    if let Some(link) = doc.select(&canonical).next() {
        if let Some(href) = link.value().attr("href") {
            let href = href.trim();
            if !href.is_empty() {
                return Some(href.to_string());
            }
        }
    }
    let og_url = selector("meta[property='og:url']");
    doc.select(&og_url)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Combines property (falling back to name) into a normalised key:
/// lowercase, dots to colons, whitespace removed.
fn normalize_meta_key(raw: &str) -> String {
    raw.to_lowercase()
        .replace('.', ":")
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect()
}

fn collect_meta_values(doc: &Html) -> Vec<(String, String)> {
    let meta_sel = selector("meta");
    let mut out = Vec::new();
    for meta in doc.select(&meta_sel) {
        let Some(content) = meta.value().attr("content") else {
            continue;
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        let key = meta
            .value()
            .attr("property")
            .or_else(|| meta.value().attr("name"));
        if let Some(key) = key {
            out.push((normalize_meta_key(key), content.to_string()));
        }
    }
    out
}

/// Verbosity ranks by word count first, string length second.
fn verbosity(value: &str) -> (usize, usize) {
    (value.split_whitespace().count(), value.chars().count())
}

fn most_verbose(values: &[(String, String)], keys: &[&str]) -> Option<String> {
    let mut best: Option<&str> = None;
    for (key, value) in values {
        if !keys.contains(&key.as_str()) {
            continue;
        }
        match best {
            None => best = Some(value),
            Some(current) if verbosity(value) > verbosity(current) => best = Some(value),
            _ => {}
        }
    }
    best.map(|v| v.to_string())
}

fn harvest_json_ld(doc: &Html) -> Option<JsonLd> {
    let script_sel = selector("script[type='application/ld+json']");
    for script in doc.select(&script_sel) {
        let text = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let Some(block) = select_article_block(&value) else {
            continue;
        };
        if let Some(parsed) = extract_json_ld(block) {
            return Some(parsed);
        }
    }
    None
}

fn context_is_schema_org(value: &Value) -> bool {
    value
        .get("@context")
        .and_then(Value::as_str)
        .map(|ctx| ctx.trim_end_matches('/').ends_with("://schema.org"))
        .unwrap_or(false)
}

fn type_is_article(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(s)) => ARTICLE_TYPES.contains(&s.as_str()),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(Value::as_str)
            .any(|s| ARTICLE_TYPES.contains(&s)),
        _ => false,
    }
}

fn select_article_block(value: &Value) -> Option<&Value> {
    if !context_is_schema_org(value) {
        // Top-level arrays of blocks are common in the wild; take the
        // first schema.org entry.
        if let Value::Array(items) = value {
            return items.iter().find_map(select_article_block);
        }
        return None;
    }
    if let Some(Value::Array(graph)) = value.get("@graph") {
        return graph.iter().find(|item| type_is_article(item));
    }
    if type_is_article(value) {
        return Some(value);
    }
    None
}

fn string_field(block: &Value, key: &str) -> Option<String> {
    block
        .get(key)
        .and_then(Value::as_str)
        .map(|s| normalize_spaces(s))
        .filter(|s| !s.is_empty())
}

fn author_field(block: &Value) -> Option<String> {
    match block.get("author") {
        Some(Value::Object(author)) => author
            .get("name")
            .and_then(Value::as_str)
            .map(|s| normalize_spaces(s)),
        Some(Value::Array(authors)) => {
            let names: Vec<String> = authors
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(normalize_spaces)
                .filter(|s| !s.is_empty())
                .collect();
            if names.is_empty() {
                None
            } else {
                Some(names.join(", "))
            }
        }
        Some(Value::String(name)) => Some(normalize_spaces(name)),
        _ => None,
    }
}

fn nested_name(block: &Value, key: &str) -> Option<String> {
    block
        .get(key)
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .map(|s| normalize_spaces(s))
        .filter(|s| !s.is_empty())
}

fn extract_json_ld(block: &Value) -> Option<JsonLd> {
    let parsed = JsonLd {
        name: string_field(block, "name"),
        headline: string_field(block, "headline"),
        author: author_field(block),
        description: string_field(block, "description")
            .or_else(|| string_field(block, "summary")),
        publisher: nested_name(block, "publisher"),
        creator: nested_name(block, "creator"),
        date_published: string_field(block, "datePublished")
            .or_else(|| string_field(block, "dateCreated")),
    };
    if parsed == JsonLd::default() {
        None
    } else {
        Some(parsed)
    }
}

/// Prefer `headline` over `name` only when the headline resembles the
/// page's own title and the name does not.
fn reconcile_ld_title(
    ld: &JsonLd,
    html_title: Option<&str>,
    meta_title: Option<&str>,
) -> Option<String> {
    let reference = html_title.or(meta_title).unwrap_or_default();
    match (&ld.name, &ld.headline) {
        (Some(name), Some(headline)) if name != headline => {
            let headline_matches = similarity(headline, reference) >= 0.75;
            let name_matches = similarity(name, reference) >= 0.75;
            if headline_matches && !name_matches {
                Some(headline.clone())
            } else {
                Some(name.clone())
            }
        }
        (Some(name), _) => Some(name.clone()),
        (None, Some(headline)) => Some(headline.clone()),
        (None, None) => None,
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Chooses the document title from `<title>` via separator splitting,
/// falling back to a sole `<h1>` for degenerate lengths.
pub fn document_title(doc: &Html) -> Option<String> {
    let title_sel = selector("title");
    let original = doc
        .select(&title_sel)
        .next()
        .map(|t| normalize_spaces(&t.text().collect::<String>()))?;
    if original.is_empty() {
        return None;
    }

    let mut current = original.clone();
    let mut had_hierarchical_split = false;

    if let Some(last) = HIERARCHICAL_SEP_RE.find_iter(&original).last() {
        had_hierarchical_split = true;
        let left = original[..last.start()].trim();
        let right = original[last.end()..].trim();
        let kept = if word_count(left) > word_count(right) {
            left
        } else if word_count(right) > word_count(left) {
            right
        } else {
            ""
        };
        current = if kept.is_empty() || word_count(kept) < 3 {
            original.clone()
        } else {
            kept.to_string()
        };
    } else if let Some(first_colon) = original.find(": ") {
        let last_colon = original.rfind(": ").unwrap_or(first_colon);
        let mut candidate = original[last_colon + 2..].trim().to_string();
        if word_count(&candidate) <= 3 {
            candidate = original[first_colon + 2..].trim().to_string();
        }
        let before_first = &original[..first_colon];
        current = if word_count(before_first) > 5 {
            original.clone()
        } else {
            candidate
        };
    } else if !(15..=150).contains(&original.chars().count()) {
        let h1_sel = selector("h1");
        let h1s: Vec<_> = doc.select(&h1_sel).collect();
        if h1s.len() == 1 {
            current = normalize_spaces(&h1s[0].text().collect::<String>());
        }
    }

    // Very short results are usually over-trimmed; the one-word
    // hierarchical shave is the only trusted case.
    if word_count(&current) <= 4 {
        let without_separators = HIERARCHICAL_SEP_RE.replace_all(&original, " ");
        let shaved_by_one = had_hierarchical_split
            && word_count(&without_separators) == word_count(&current) + 1;
        if !shaved_by_one {
            current = original;
        }
    }

    if current.is_empty() {
        None
    } else {
        Some(current)
    }
}

fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(parsed);
    }
    dateparser::parse(raw.trim())
        .ok()
        .map(|utc| utc.fixed_offset())
}

fn detect_language(doc: &Html, meta_values: &[(String, String)]) -> Option<String> {
    let html_sel = selector("html");
    if let Some(html) = doc.select(&html_sel).next() {
        if let Some(lang) = html.value().attr("lang") {
            let trimmed = lang.trim();
            if !trimmed.is_empty() {
                return Some(primary_language_tag(trimmed));
            }
        }
    }
    for key in ["og:locale", "language"] {
        if let Some(value) = meta_values
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v.as_str())
        {
            return Some(primary_language_tag(value));
        }
    }
    None
}

fn primary_language_tag(raw: &str) -> String {
    raw.split(['-', '_'])
        .next()
        .unwrap_or(raw)
        .to_lowercase()
}

/// Text direction: an explicit `dir` attribute wins; otherwise RTL
/// character frequency over the article text at a 30% threshold.
pub fn detect_direction(doc: &Html, article_text: &str) -> String {
    for css in ["html", "body"] {
        if let Some(element) = doc.select(&selector(css)).next() {
            if let Some(dir) = element.value().attr("dir") {
                let dir = dir.trim().to_lowercase();
                if dir == "ltr" || dir == "rtl" {
                    return dir;
                }
            }
        }
    }

    let mut rtl_count = 0u32;
    let mut letter_count = 0u32;
    for ch in article_text.chars() {
        if ch.is_alphabetic() {
            letter_count += 1;
            if is_rtl_char(ch) {
                rtl_count += 1;
            }
        }
    }
    if letter_count > 0 && (rtl_count as f64 / letter_count as f64) >= 0.30 {
        "rtl".to_string()
    } else {
        "ltr".to_string()
    }
}

/// Check if a character is in RTL unicode ranges (Hebrew or Arabic).
fn is_rtl_char(ch: char) -> bool {
    let code = ch as u32;
    (0x0590..=0x05FF).contains(&code)
        || (0xFB1D..=0xFB4F).contains(&code)
        || (0x0600..=0x06FF).contains(&code)
        || (0x0750..=0x077F).contains(&code)
        || (0x08A0..=0x08FF).contains(&code)
        || (0xFB50..=0xFDFF).contains(&code)
        || (0xFE70..=0xFEFF).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_title_hierarchical_split_keeps_longer_side() {
        let doc = parse("<html><head><title>Foo Bar Baz — Acme</title></head><body><h1>Foo Bar Baz</h1></body></html>");
        assert_eq!(document_title(&doc).as_deref(), Some("Foo Bar Baz"));
        let doc2 = parse("<html><head><title>Foo Bar Baz - Acme</title></head><body></body></html>");
        assert_eq!(document_title(&doc2).as_deref(), Some("Foo Bar Baz"));
    }

    #[test]
    fn test_title_tie_falls_back_to_original() {
        let doc = parse("<html><head><title>One Two | Three Four</title></head></html>");
        assert_eq!(document_title(&doc).as_deref(), Some("One Two | Three Four"));
    }

    #[test]
    fn test_title_colon_split() {
        let doc = parse(
            "<html><head><title>Acme: The Grand Unified Launch Report</title></head></html>",
        );
        assert_eq!(
            document_title(&doc).as_deref(),
            Some("The Grand Unified Launch Report")
        );
    }

    #[test]
    fn test_title_long_pre_colon_keeps_original() {
        let doc = parse(
            "<html><head><title>One two three four five six: Short End Here Now</title></head></html>",
        );
        assert_eq!(
            document_title(&doc).as_deref(),
            Some("One two three four five six: Short End Here Now")
        );
    }

    #[test]
    fn test_title_short_prefers_sole_h1() {
        let doc = parse(
            "<html><head><title>Short</title></head><body><h1>The Actual Descriptive Headline Of It</h1></body></html>",
        );
        assert_eq!(
            document_title(&doc).as_deref(),
            Some("The Actual Descriptive Headline Of It")
        );
    }

    #[test]
    fn test_meta_key_normalisation() {
        assert_eq!(normalize_meta_key("OG:Title"), "og:title");
        assert_eq!(normalize_meta_key("dc.title"), "dc:title");
        assert_eq!(normalize_meta_key("weibo: article: title"), "weibo:article:title");
    }

    #[test]
    fn test_most_verbose_prefers_word_count() {
        let values = vec![
            ("og:title".to_string(), "Short one".to_string()),
            ("twitter:title".to_string(), "A longer title with words".to_string()),
        ];
        assert_eq!(
            most_verbose(&values, TITLE_KEYS).as_deref(),
            Some("A longer title with words")
        );
    }

    #[test]
    fn test_harvest_meta_only() {
        let doc = parse(concat!(
            "<html lang='en-US'><head>",
            "<meta property='og:title' content='Meta Title Of Record'>",
            "<meta name='author' content='Jane Roe'>",
            "<meta property='og:description' content='A descriptive sentence about this page.'>",
            "<meta property='og:site_name' content='Example Site'>",
            "<meta property='article:published_time' content='2024-06-15T12:00:00Z'>",
            "</head><body></body></html>"
        ));
        let meta = harvest(&doc);
        assert_eq!(meta.title.as_deref(), Some("Meta Title Of Record"));
        assert_eq!(meta.byline.as_deref(), Some("Jane Roe"));
        assert_eq!(
            meta.excerpt.as_deref(),
            Some("A descriptive sentence about this page.")
        );
        assert_eq!(meta.site_name.as_deref(), Some("Example Site"));
        assert!(meta.published.is_some());
        assert_eq!(meta.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_json_ld_headline_beats_meta_when_similar_to_title() {
        let doc = parse(concat!(
            "<html><head>",
            r#"<script type="application/ld+json">{"@context":"https://schema.org","@type":"NewsArticle","headline":"Real Title","name":"Site Name"}</script>"#,
            "<meta property='og:title' content='Real Title | Site'>",
            "</head><body></body></html>"
        ));
        let meta = harvest(&doc);
        assert_eq!(meta.title.as_deref(), Some("Real Title"));
        assert_eq!(meta.site_name, None);
    }

    #[test]
    fn test_json_ld_graph_and_publisher() {
        let doc = parse(concat!(
            "<html><head>",
            r#"<script type="application/ld+json">{"@context":"https://schema.org","@graph":[{"@type":"WebSite","name":"site"},{"@type":"BlogPosting","name":"Post Name","author":{"name":"Jane Roe"},"publisher":{"name":"Acme Press"},"datePublished":"2023-02-01T09:30:00+01:00"}]}</script>"#,
            "</head><body></body></html>"
        ));
        let meta = harvest(&doc);
        assert_eq!(meta.title.as_deref(), Some("Post Name"));
        assert_eq!(meta.byline.as_deref(), Some("Jane Roe"));
        assert_eq!(meta.site_name.as_deref(), Some("Acme Press"));
        assert_eq!(
            meta.published.map(|d| d.to_rfc3339()),
            Some("2023-02-01T09:30:00+01:00".to_string())
        );
    }

    #[test]
    fn test_json_ld_author_array() {
        let block: Value = serde_json::from_str(
            r#"{"author":[{"name":"A One"},{"name":"B Two"}]}"#,
        )
        .unwrap();
        assert_eq!(author_field(&block).as_deref(), Some("A One, B Two"));
    }

    #[test]
    fn test_json_ld_malformed_is_skipped() {
        let doc = parse(concat!(
            "<html><head>",
            r#"<script type="application/ld+json">{not json at all</script>"#,
            r#"<script type="application/ld+json">{"@context":"https://schema.org","@type":"Article","name":"Good Block Title"}</script>"#,
            "</head><body></body></html>"
        ));
        let meta = harvest(&doc);
        assert_eq!(meta.title.as_deref(), Some("Good Block Title"));
    }

    #[test]
    fn test_json_ld_wrong_context_ignored() {
        let doc = parse(concat!(
            "<html><head>",
            r#"<script type="application/ld+json">{"@context":"https://example.org","@type":"Article","name":"Nope"}</script>"#,
            "</head><body></body></html>"
        ));
        let meta = harvest(&doc);
        assert_eq!(meta.title, None);
    }

    #[test]
    fn test_unparseable_date_left_unset() {
        let doc = parse(concat!(
            "<html><head>",
            "<meta property='article:published_time' content='not a date at all, ever'>",
            "</head><body></body></html>"
        ));
        let meta = harvest(&doc);
        assert!(meta.published.is_none());
    }

    #[test]
    fn test_discover_document_url_canonical_first() {
        let doc = parse(concat!(
            "<html><head>",
            "<link rel='canonical' href='https://example.com/canonical'>",
            "<meta property='og:url' content='https://example.com/og'>",
            "</head><body></body></html>"
        ));
        assert_eq!(
            discover_document_url(&doc).as_deref(),
            Some("https://example.com/canonical")
        );
    }

    #[test]
    fn test_discover_document_url_og_fallback() {
        let doc = parse(concat!(
            "<html><head>",
            "<meta property='og:url' content='https://example.com/og'>",
            "</head><body></body></html>"
        ));
        assert_eq!(
            discover_document_url(&doc).as_deref(),
            Some("https://example.com/og")
        );
    }

    #[test]
    fn test_detect_direction_explicit_attr() {
        let doc = parse("<html dir='rtl'><head></head><body></body></html>");
        assert_eq!(detect_direction(&doc, "plain latin text"), "rtl");
    }

    #[test]
    fn test_detect_direction_from_characters() {
        let doc = parse("<html><head></head><body></body></html>");
        assert_eq!(detect_direction(&doc, "שלום עולם, זה טקסט בעברית"), "rtl");
        assert_eq!(detect_direction(&doc, "plain latin text"), "ltr");
    }
}
