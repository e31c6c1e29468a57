// ABOUTME: Attribute-name weights, per-tag element factors, and comma scoring.
// ABOUTME: Backs both the element-based scorer and the compatibility algorithm's class weighting.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use dom_query::NodeRef;
use once_cell::sync::Lazy;

use super::{element_children, node_attr, node_name};

const NEGATIVE_NAMES: &[&str] = &[
    "-ad-",
    "hidden",
    "hid",
    "banner",
    "combx",
    "comment",
    "com-",
    "contact",
    "foot",
    "footer",
    "footnote",
    "gdpr",
    "masthead",
    "media",
    "meta",
    "outbrain",
    "promo",
    "related",
    "scroll",
    "share",
    "shoutbox",
    "sidebar",
    "skyscraper",
    "sponsor",
    "shopping",
    "tags",
    "tool",
    "widget",
];

const POSITIVE_NAMES: &[&str] = &[
    "article",
    "body",
    "content",
    "entry",
    "hentry",
    "h-entry",
    "main",
    "page",
    "pagination",
    "post",
    "text",
    "blog",
    "story",
];

static NEGATIVE_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(NEGATIVE_NAMES)
        .expect("failed to build negative name matcher")
});

static POSITIVE_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(POSITIVE_NAMES)
        .expect("failed to build positive name matcher")
});

/// The fixed Unicode comma set recognised by the conditional cleaner and
/// the compatibility scorer.
pub const COMMAS: &[char] = &[
    '\u{002C}', '\u{060C}', '\u{FE50}', '\u{FE10}', '\u{FE11}', '\u{2E41}', '\u{2E34}',
    '\u{2E32}', '\u{FF0C}',
];

pub fn count_commas(text: &str) -> usize {
    text.chars().filter(|ch| COMMAS.contains(ch)).count()
}

/// The signed per-attribute increment over the class, id, and name
/// attributes: at most one −1 and one +1 per attribute, as detected over
/// whitespace-separated tokens by substring match.
fn name_weight_units(node: &NodeRef) -> i32 {
    let mut units = 0;
    for attr in ["class", "id", "name"] {
        let Some(value) = node_attr(node, attr) else {
            continue;
        };
        let mut negative = false;
        let mut positive = false;
        for token in value.split_whitespace() {
            if !negative && NEGATIVE_MATCHER.is_match(token) {
                negative = true;
            }
            if !positive && POSITIVE_MATCHER.is_match(token) {
                positive = true;
            }
            if negative && positive {
                break;
            }
        }
        if negative {
            units -= 1;
        }
        if positive {
            units += 1;
        }
    }
    units
}

/// Fractional name weight (±0.1 per attribute) added to the element
/// factor by the element-based scorer.
pub fn name_weight(node: &NodeRef) -> f64 {
    name_weight_units(node) as f64 * 0.1
}

/// Integer name weight (±25 per attribute) used by the compatibility
/// algorithm and the conditional cleaner. `weight_classes` off pins it
/// to zero.
pub fn class_weight(node: &NodeRef, weight_classes: bool) -> i32 {
    if !weight_classes {
        return 0;
    }
    name_weight_units(node) * 25
}

/// Multiplicative per-tag prior on article-likeness.
pub fn element_factor(tag: &str) -> f64 {
    match tag {
        "article" | "section" => 1.2,
        "div" | "main" => 1.1,
        "pre" | "table" | "tbody" | "tr" | "td" => 0.9,
        "address" | "blockquote" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => 0.8,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "hgroup" | "header" | "footer" => 0.5,
        _ => 1.0,
    }
}

/// Element factor for a node. A single-child chain is followed to its
/// first multi-child descendant, whose tag drives the lookup, minus a
/// 0.1-per-hop penalty.
pub fn element_factor_for(node: &NodeRef) -> f64 {
    let mut current = node.clone();
    let mut hops = 0usize;
    loop {
        let children = element_children(&current);
        if children.len() != 1 {
            break;
        }
        current = children[0].clone();
        hops += 1;
    }
    let base = element_factor(&node_name(&current));
    base - 0.1 * hops as f64
}

/// Tag-bias constant seeding ancestor scores in the compatibility
/// algorithm.
pub fn initial_tag_score(tag: &str) -> f64 {
    match tag {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}
