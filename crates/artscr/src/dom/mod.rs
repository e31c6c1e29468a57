// ABOUTME: DOM tag classification tables and traversal helpers over dom_query nodes.
// ABOUTME: Owns the layout/category model plus the visibility and byline predicates.

pub mod css;
pub mod scoring;

use bitflags::bitflags;
use dom_query::{NodeRef, Selection};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

bitflags! {
    /// HTML5 content-model categories a tag belongs to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Categories: u8 {
        const METADATA = 1 << 0;
        const SCRIPT = 1 << 1;
        const FORM = 1 << 2;
        const PHRASING = 1 << 3;
        const HEADING = 1 << 4;
        const EMBEDDED = 1 << 5;
        const SECTIONING = 1 << 6;
    }
}

/// Whether a tag renders as a block-level or inline box by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Block,
    Inline,
}

static BLOCK_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "address",
        "article",
        "aside",
        "blockquote",
        "body",
        "caption",
        "center",
        "dd",
        "details",
        "dialog",
        "dir",
        "div",
        "dl",
        "dt",
        "fieldset",
        "figcaption",
        "figure",
        "footer",
        "form",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "header",
        "hgroup",
        "hr",
        "html",
        "li",
        "main",
        "menu",
        "nav",
        "ol",
        "p",
        "pre",
        "section",
        "summary",
        "table",
        "tbody",
        "td",
        "tfoot",
        "th",
        "thead",
        "tr",
        "ul",
    ]
    .into_iter()
    .collect()
});

/// Phrasing-content tags, restricted to the safe subset (no canvas,
/// iframe, svg, video). `a`, `del`, and `ins` are transparent and handled
/// separately by [`is_phrasing_content`].
static PHRASING_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abbr", "audio", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "datalist",
        "dfn", "em", "embed", "i", "img", "input", "kbd", "label", "mark", "math", "meter",
        "noscript", "object", "output", "progress", "q", "rp", "rt", "ruby", "s", "samp",
        "script", "select", "small", "span", "strong", "sub", "sup", "textarea", "time", "u",
        "var", "wbr",
    ]
    .into_iter()
    .collect()
});

/// Tags whose content model does not accept phrasing content: structural
/// containers with a fixed child vocabulary, raw-text elements, and voids.
static NO_PHRASING_CONTENT: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "audio", "base", "br", "col", "colgroup", "dl", "embed", "frame", "frameset",
        "head", "hr", "html", "iframe", "img", "input", "link", "map", "menu", "meta", "ol",
        "optgroup", "option", "param", "picture", "script", "select", "source", "style", "svg",
        "table", "tbody", "textarea", "tfoot", "thead", "title", "tr", "track", "ul", "video",
        "wbr",
    ]
    .into_iter()
    .collect()
});

static VOID_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

static BYLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)byline|author|dateline|writtenby|p-author").unwrap());

pub fn tag_layout(tag: &str) -> Layout {
    if BLOCK_TAGS.contains(tag) {
        Layout::Block
    } else {
        Layout::Inline
    }
}

pub fn tag_categories(tag: &str) -> Categories {
    let mut cats = Categories::empty();
    match tag {
        "head" | "title" | "meta" | "link" | "style" | "base" => {
            cats |= Categories::METADATA;
        }
        "script" | "noscript" | "template" => {
            cats |= Categories::SCRIPT;
        }
        "form" | "input" | "select" | "textarea" | "button" | "option" | "optgroup"
        | "fieldset" | "legend" | "label" | "output" | "datalist" => {
            cats |= Categories::FORM;
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "hgroup" => {
            cats |= Categories::HEADING;
        }
        "article" | "section" | "aside" | "nav" => {
            cats |= Categories::SECTIONING;
        }
        "img" | "picture" | "video" | "audio" | "svg" | "canvas" | "iframe" | "embed"
        | "object" | "source" => {
            cats |= Categories::EMBEDDED;
        }
        _ => {}
    }
    if PHRASING_TAGS.contains(tag) {
        cats |= Categories::PHRASING;
    }
    cats
}

pub fn permits_phrasing(tag: &str) -> bool {
    !NO_PHRASING_CONTENT.contains(tag) && !VOID_TAGS.contains(tag)
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

/// Lowercased tag name of a node, empty for non-elements.
pub fn node_name(node: &NodeRef) -> String {
    node.node_name()
        .map(|n| n.to_lowercase())
        .unwrap_or_default()
}

/// Attribute lookup on a node, ASCII case-insensitive on the name.
pub fn node_attr(node: &NodeRef, name: &str) -> Option<String> {
    node.attrs()
        .iter()
        .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
        .map(|attr| attr.value.to_string())
}

pub fn has_attr(node: &NodeRef, name: &str) -> bool {
    node.attrs()
        .iter()
        .any(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
}

/// Direct element children in document order.
pub fn element_children<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    node.children_it(false)
        .filter(|child| child.is_element())
        .collect()
}

/// Counts children that matter to the content model: elements plus
/// non-whitespace text nodes. Comments and blank text do not count.
pub fn significant_child_count(node: &NodeRef) -> usize {
    node.children_it(false)
        .filter(|child| {
            if child.is_element() {
                true
            } else if child.is_text() {
                !child.text().trim().is_empty()
            } else {
                false
            }
        })
        .count()
}

/// Element ancestors from the parent upward, stopping at (and excluding)
/// the document node. `max` of `None` walks to the top.
pub fn ancestors<'a>(node: &NodeRef<'a>, max: Option<usize>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        if !parent.is_element() {
            break;
        }
        out.push(parent.clone());
        if let Some(limit) = max {
            if out.len() >= limit {
                break;
            }
        }
        current = parent.parent();
    }
    out
}

/// All descendant elements of `node` in document order (node excluded).
pub fn descendant_elements<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeRef> = node.children_it(true).collect();
    while let Some(current) = stack.pop() {
        if current.is_element() {
            out.push(current.clone());
        }
        stack.extend(current.children_it(true));
    }
    out
}

/// Depth of `node` below the document root.
pub fn nesting_level(node: &NodeRef) -> usize {
    ancestors(node, None).len()
}

/// `a` contains `b` among its descendants.
pub fn contains(a: &NodeRef, b: &NodeRef) -> bool {
    let mut current = b.parent();
    while let Some(parent) = current {
        if parent.id == a.id {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// True when any ancestor's tag equals `tag`.
pub fn has_ancestor_tag(node: &NodeRef, tag: &str) -> bool {
    ancestors(node, None)
        .iter()
        .any(|ancestor| node_name(ancestor) == tag)
}

/// Whitespace-normalized text of a subtree.
pub fn inner_text(sel: &Selection) -> String {
    normalize_spaces(&sel.text())
}

pub fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A node participates in phrasing content when it is text, a phrasing
/// tag, or a transparent `a`/`del`/`ins` whose children all qualify.
pub fn is_phrasing_content(node: &NodeRef) -> bool {
    if node.is_text() {
        return true;
    }
    if !node.is_element() {
        return false;
    }
    let name = node_name(node);
    if PHRASING_TAGS.contains(name.as_str()) {
        return true;
    }
    matches!(name.as_str(), "a" | "del" | "ins")
        && node
            .children_it(false)
            .all(|child| is_phrasing_content(&child))
}

/// The defensive visibility predicate: answers hidden only on positive
/// evidence, probably-visible otherwise.
pub fn is_probably_hidden(node: &NodeRef) -> bool {
    if let Some(style) = node_attr(node, "style") {
        if let Some(display) = css::declaration_value(&style, "display") {
            if display.eq_ignore_ascii_case("none") {
                return true;
            }
        }
        if let Some(visibility) = css::declaration_value(&style, "visibility") {
            if visibility.eq_ignore_ascii_case("hidden") {
                return true;
            }
        }
    }
    if has_attr(node, "hidden") {
        return true;
    }
    if let Some(aria) = node_attr(node, "aria-hidden") {
        if aria.trim().eq_ignore_ascii_case("true") {
            return true;
        }
    }
    if let Some(class) = node_attr(node, "class") {
        if class.to_lowercase().contains("hidden") {
            return true;
        }
    }
    if let Some(kind) = node_attr(node, "type") {
        if kind.eq_ignore_ascii_case("hidden") {
            return true;
        }
    }
    false
}

/// Byline detection per attribute markers and the name pattern; the text
/// length window keeps whole author boxes from matching.
pub fn is_byline_candidate(node: &NodeRef) -> bool {
    let matches_marker = node_attr(node, "rel")
        .map(|rel| rel.eq_ignore_ascii_case("author"))
        .unwrap_or(false)
        || node_attr(node, "itemprop")
            .map(|prop| prop.to_lowercase().contains("author"))
            .unwrap_or(false)
        || {
            let class = node_attr(node, "class").unwrap_or_default();
            let id = node_attr(node, "id").unwrap_or_default();
            BYLINE_RE.is_match(&class) || BYLINE_RE.is_match(&id)
        };
    if !matches_marker {
        return false;
    }
    let text = normalize_spaces(&node.text());
    !text.is_empty() && text.chars().count() < 100
}

/// Link density of a subtree: anchor text over total text, with anchors
/// to same-document fragments weighted 0.3.
pub fn link_density(sel: &Selection) -> f64 {
    let total = inner_text(sel).chars().count();
    if total == 0 {
        return 0.0;
    }
    let mut link_len = 0.0f64;
    for anchor in sel.select("a").iter() {
        let text_len = inner_text(&anchor).chars().count() as f64;
        let href = anchor.attr("href").unwrap_or_default();
        if href.trim_start().starts_with('#') {
            link_len += text_len * 0.3;
        } else {
            link_len += text_len;
        }
    }
    link_len / total as f64
}

/// Path of a node from the root, `html > body > div#main.article` style,
/// used by the CLI report.
pub fn node_path(node: &NodeRef) -> String {
    let mut parts = vec![describe(node)];
    for ancestor in ancestors(node, None) {
        parts.push(describe(&ancestor));
    }
    parts.reverse();
    parts.join(" > ")
}

fn describe(node: &NodeRef) -> String {
    let mut out = node_name(node);
    if let Some(id) = node_attr(node, "id") {
        if !id.is_empty() {
            out.push('#');
            out.push_str(&id);
        }
    }
    if let Some(class) = node_attr(node, "class") {
        for token in class.split_whitespace() {
            out.push('.');
            out.push_str(token);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_query::Document;

    fn first<'a>(doc: &'a Document, selector: &str) -> NodeRef<'a> {
        doc.select(selector).nodes().first().unwrap().clone()
    }

    #[test]
    fn test_tag_layout() {
        assert_eq!(tag_layout("div"), Layout::Block);
        assert_eq!(tag_layout("td"), Layout::Block);
        assert_eq!(tag_layout("span"), Layout::Inline);
        assert_eq!(tag_layout("custom-el"), Layout::Inline);
    }

    #[test]
    fn test_tag_categories() {
        assert!(tag_categories("meta").contains(Categories::METADATA));
        assert!(tag_categories("script").contains(Categories::SCRIPT));
        assert!(tag_categories("input").contains(Categories::FORM));
        assert!(tag_categories("h2").contains(Categories::HEADING));
        assert!(tag_categories("span").contains(Categories::PHRASING));
        assert!(tag_categories("div").is_empty());
    }

    #[test]
    fn test_permits_phrasing() {
        assert!(permits_phrasing("p"));
        assert!(permits_phrasing("div"));
        assert!(!permits_phrasing("ul"));
        assert!(!permits_phrasing("table"));
        assert!(!permits_phrasing("img"));
    }

    #[test]
    fn test_significant_child_count_skips_whitespace() {
        let doc = Document::from("<div>  <p>a</p>\n  <p>b</p> text </div>");
        let div = first(&doc, "div");
        assert_eq!(significant_child_count(&div), 3);
    }

    #[test]
    fn test_ancestors_and_nesting() {
        let doc = Document::from("<html><body><main><div><p>x</p></div></main></body></html>");
        let p = first(&doc, "p");
        let chain: Vec<_> = ancestors(&p, None).iter().map(node_name).collect();
        assert_eq!(chain, vec!["div", "main", "body", "html"]);
        assert_eq!(nesting_level(&p), 4);
        assert_eq!(ancestors(&p, Some(2)).len(), 2);
    }

    #[test]
    fn test_contains() {
        let doc = Document::from("<div id='a'><p id='b'>x</p></div><div id='c'></div>");
        let a = first(&doc, "#a");
        let b = first(&doc, "#b");
        let c = first(&doc, "#c");
        assert!(contains(&a, &b));
        assert!(!contains(&a, &c));
        assert!(!contains(&b, &a));
    }

    #[test]
    fn test_is_phrasing_content_transparent_anchor() {
        let doc = Document::from("<p><a href='#'>plain <b>bold</b></a><a><div>no</div></a></p>");
        let anchors = doc.select("a");
        let nodes = anchors.nodes();
        assert!(is_phrasing_content(&nodes[0]));
        assert!(!is_phrasing_content(&nodes[1]));
    }

    #[test]
    fn test_is_probably_hidden() {
        let doc = Document::from(concat!(
            "<div id='a' style='display: none'></div>",
            "<div id='b' aria-hidden='true'></div>",
            "<div id='c' class='is-hidden'></div>",
            "<input id='d' type='hidden'>",
            "<div id='e' style='color: red'>visible</div>",
        ));
        assert!(is_probably_hidden(&first(&doc, "#a")));
        assert!(is_probably_hidden(&first(&doc, "#b")));
        assert!(is_probably_hidden(&first(&doc, "#c")));
        assert!(is_probably_hidden(&first(&doc, "#d")));
        assert!(!is_probably_hidden(&first(&doc, "#e")));
    }

    #[test]
    fn test_byline_candidate() {
        let doc = Document::from(concat!(
            "<span id='a' rel='author'>Jane Roe</span>",
            "<div id='b' class='byline'>By Jane Roe</div>",
            "<div id='c' class='byline'></div>",
        ));
        assert!(is_byline_candidate(&first(&doc, "#a")));
        assert!(is_byline_candidate(&first(&doc, "#b")));
        assert!(!is_byline_candidate(&first(&doc, "#c")));
    }

    #[test]
    fn test_link_density_fragment_weighting() {
        let doc = Document::from("<div><a href='#top'>aaaaa</a>bbbbb</div>");
        let div = doc.select("div");
        let density = link_density(&div);
        // 5 chars of fragment-anchor text at 0.3 weight over 10 total.
        assert!((density - 0.15).abs() < 0.001);
    }

    #[test]
    fn test_node_path() {
        let doc =
            Document::from("<html><body><div id='main' class='a b'><p>x</p></div></body></html>");
        let p = first(&doc, "p");
        assert_eq!(node_path(&p), "html > body > div#main.a.b > p");
    }
}
