// ABOUTME: Compatibility extraction pass used when the element-based pick runs thin.
// ABOUTME: Strips unlikely blocks, scores a fixed tag set with ancestor propagation, merges siblings.

use std::collections::HashMap;

use bitflags::bitflags;
use dom_query::{Document, NodeId, NodeRef, Selection};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::scoring::{class_weight, count_commas, initial_tag_score};
use crate::dom::{
    self, element_children, inner_text, is_byline_candidate, is_phrasing_content,
    is_probably_hidden, link_density, node_attr, node_name, normalize_spaces,
    significant_child_count,
};
use crate::options::Options;
use crate::prep::{self, PrepFlags};

bitflags! {
    /// Cleanup switches dropped one by one across retry attempts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CleanupFlags: u8 {
        const STRIP_UNLIKELYS = 1 << 0;
        const WEIGHT_CLASSES = 1 << 1;
        const CLEAN_CONDITIONALLY = 1 << 2;
    }
}

static UNLIKELY_CANDIDATES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
    )
    .unwrap()
});

static MAYBE_CANDIDATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)and|article|body|column|content|main|shadow").unwrap());

const SCORABLE_TAGS: &str = "section, h2, h3, h4, h5, h6, p, td, pre";

/// One completed extraction pass: the wrapped article HTML and its plain
/// text length.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub html: String,
    pub text_len: usize,
}

/// Result of a single compatibility pass over a pristine reparse of the
/// source. `byline` carries the first byline node removed along the way.
pub struct PassResult {
    pub attempt: Option<Attempt>,
    pub byline: Option<String>,
}

/// Runs one flag-configured pass: strip, paragraph normalisation, fixed-set
/// scoring, candidate election, sibling merge, prep, wrap.
pub fn extract_with_flags(source: &str, options: &Options, flags: CleanupFlags) -> PassResult {
    let doc = Document::from(source);
    let byline = strip_unlikely_nodes(&doc, flags);
    normalize_paragraphs(&doc);

    let scores = score_document(&doc, flags);
    if scores.is_empty() {
        return PassResult {
            attempt: None,
            byline,
        };
    }

    let Some((top_id, tops)) = rank_candidates(&doc, &scores, options.n_top_candidates) else {
        return PassResult {
            attempt: None,
            byline,
        };
    };

    let mut pick = match node_by_id(&doc, top_id) {
        Some(node) => node,
        None => {
            return PassResult {
                attempt: None,
                byline,
            }
        }
    };

    pick = promote_shared_ancestor(&doc, &pick, &scores, &tops).unwrap_or(pick);
    pick = climb_rising_parents(&pick, &scores);
    pick = climb_only_children(&pick);

    let merged = merge_siblings(&pick, &scores);
    let attempt = prep_and_wrap(&merged, flags);

    PassResult {
        attempt: Some(attempt),
        byline,
    }
}

fn node_by_id<'a>(doc: &'a Document, id: NodeId) -> Option<NodeRef<'a>> {
    doc.select("*")
        .nodes()
        .iter()
        .find(|node| node.id == id)
        .cloned()
}

fn combined_class_id(node: &NodeRef) -> String {
    format!(
        "{} {}",
        node_attr(node, "class").unwrap_or_default(),
        node_attr(node, "id").unwrap_or_default()
    )
}

fn is_unlikely(node: &NodeRef) -> bool {
    let name = node_name(node);
    if name == "body" || name == "a" {
        return false;
    }
    let combo = combined_class_id(node);
    if combo.trim().is_empty() {
        return false;
    }
    if MAYBE_CANDIDATE_RE.is_match(&combo) {
        return false;
    }
    if !UNLIKELY_CANDIDATES_RE.is_match(&combo) {
        return false;
    }
    !dom::has_ancestor_tag(node, "table") && !dom::has_ancestor_tag(node, "code")
}

fn is_modal_dialog(node: &NodeRef) -> bool {
    node_attr(node, "aria-modal").map_or(false, |v| v.eq_ignore_ascii_case("true"))
        && node_attr(node, "role").map_or(false, |v| v.eq_ignore_ascii_case("dialog"))
}

fn is_removable_empty(node: &NodeRef) -> bool {
    matches!(
        node_name(node).as_str(),
        "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    ) && significant_child_count(node) == 0
        && node.text().trim().is_empty()
}

/// Depth-first removal sweep. The first byline encountered is recorded
/// and removed; hidden nodes, modal dialogs, and (with the flag on)
/// unlikely candidates go with it.
fn strip_unlikely_nodes(doc: &Document, flags: CleanupFlags) -> Option<String> {
    let mut byline: Option<String> = None;
    let nodes: Vec<NodeRef> = doc.select("body *").nodes().iter().cloned().collect();

    for node in &nodes {
        if !node.is_element() {
            continue;
        }
        if is_probably_hidden(node) || is_modal_dialog(node) {
            Selection::from(node.clone()).remove();
            continue;
        }
        if byline.is_none() && is_byline_candidate(node) {
            byline = Some(normalize_spaces(&node.text()));
            Selection::from(node.clone()).remove();
            continue;
        }
        if flags.contains(CleanupFlags::STRIP_UNLIKELYS) && is_unlikely(node) {
            debug!("stripping unlikely candidate {}", combined_class_id(node));
            Selection::from(node.clone()).remove();
        }
    }

    for node in nodes {
        if node.is_element() && is_removable_empty(&node) {
            Selection::from(node).remove();
        }
    }

    byline
}

fn serialize_attrs(node: &NodeRef) -> String {
    node.attrs()
        .iter()
        .map(|attr| format!("{}=\"{}\"", attr.name.local, escape_attr(&attr.value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Divs holding only phrasing become paragraphs outright; divs mixing
/// phrasing runs with block children get the runs wrapped in `<p>`.
fn normalize_paragraphs(doc: &Document) {
    let divs: Vec<NodeRef> = doc.select("div").nodes().iter().cloned().collect();
    // Innermost first: an outer rebuild reparses its subtree, so inner
    // conversions must already be in place.
    for div in divs.into_iter().rev() {
        let children: Vec<NodeRef> = div.children_it(false).collect();
        let all_phrasing = children.iter().all(is_phrasing_content);
        if all_phrasing {
            if !div.text().trim().is_empty() {
                Selection::from(div).rename("p");
            }
            continue;
        }

        let mut rebuilt = String::new();
        let mut run = String::new();
        let mut run_has_content = false;
        let mut changed = false;
        for child in &children {
            if is_phrasing_content(child) {
                if child.is_text() {
                    let text = child.text().to_string();
                    run_has_content |= !text.trim().is_empty();
                    run.push_str(&escape_text(&text));
                } else {
                    run_has_content = true;
                    run.push_str(&Selection::from(child.clone()).html());
                }
            } else {
                if run_has_content {
                    rebuilt.push_str(&format!("<p>{}</p>", run));
                    changed = true;
                } else {
                    rebuilt.push_str(&run);
                }
                run.clear();
                run_has_content = false;
                rebuilt.push_str(&Selection::from(child.clone()).html());
            }
        }
        if run_has_content {
            rebuilt.push_str(&format!("<p>{}</p>", run));
            changed = true;
        } else {
            rebuilt.push_str(&run);
        }

        if changed {
            let attrs = serialize_attrs(&div);
            let replacement = if attrs.is_empty() {
                format!("<div>{}</div>", rebuilt)
            } else {
                format!("<div {}>{}</div>", attrs, rebuilt)
            };
            Selection::from(div).replace_with_html(replacement.as_str());
        }
    }
}

type Scores = HashMap<NodeId, f64>;

/// Scores the fixed tag set and propagates each element's score to up to
/// five ancestors, divided by 1, 2, then 3·level. Ancestors are seeded
/// with their tag bias plus the ×25 class weight.
fn score_document(doc: &Document, flags: CleanupFlags) -> Scores {
    let weight_classes = flags.contains(CleanupFlags::WEIGHT_CLASSES);
    let mut scores: Scores = HashMap::new();

    for element in doc.select(SCORABLE_TAGS).nodes() {
        let sel = Selection::from(element.clone());
        let text = inner_text(&sel);
        let len = text.chars().count();
        if len < 25 {
            continue;
        }

        let content_score =
            1.0 + count_commas(&text) as f64 + ((len / 100).min(3)) as f64;

        for (level, ancestor) in dom::ancestors(element, Some(5)).iter().enumerate() {
            let name = node_name(ancestor);
            if name == "html" {
                break;
            }
            let entry = scores.entry(ancestor.id).or_insert_with(|| {
                initial_tag_score(&name) + class_weight(ancestor, weight_classes) as f64
            });
            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                level => (level * 3) as f64,
            };
            *entry += content_score / divider;
        }
    }

    // Final score scales with text that is not link text.
    let ids: Vec<NodeId> = scores.keys().copied().collect();
    for element in doc.select("*").nodes() {
        if !ids.contains(&element.id) {
            continue;
        }
        let density = link_density(&Selection::from(element.clone()));
        if let Some(score) = scores.get_mut(&element.id) {
            *score *= 1.0 - density;
        }
    }

    scores
}

/// Orders candidates by final score and returns the leader plus the top-N
/// list (descending).
fn rank_candidates(
    doc: &Document,
    scores: &Scores,
    n_top: usize,
) -> Option<(NodeId, Vec<(NodeId, f64)>)> {
    let mut ranked: Vec<(NodeId, f64)> = Vec::new();
    for element in doc.select("*").nodes() {
        if node_name(element) == "body" {
            continue;
        }
        if let Some(&score) = scores.get(&element.id) {
            if score > 0.0 {
                ranked.push((element.id, score));
            }
        }
    }
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n_top);
    let top = ranked.first()?.0;
    Some((top, ranked))
}

/// When three or more alternates score within 75% of the leader, the
/// first leader ancestor contained in at least three alternate ancestor
/// chains takes over.
fn promote_shared_ancestor<'a>(
    doc: &'a Document,
    pick: &NodeRef<'a>,
    scores: &Scores,
    tops: &[(NodeId, f64)],
) -> Option<NodeRef<'a>> {
    let leader_score = *scores.get(&pick.id)?;
    let mut alternate_chains: Vec<Vec<NodeId>> = Vec::new();
    for &(id, score) in tops.iter().skip(1) {
        if score < leader_score * 0.75 {
            continue;
        }
        let node = node_by_id(doc, id)?;
        alternate_chains.push(dom::ancestors(&node, None).iter().map(|a| a.id).collect());
    }
    if alternate_chains.len() < 3 {
        return None;
    }

    for ancestor in dom::ancestors(pick, None) {
        if node_name(&ancestor) == "body" {
            break;
        }
        let containing = alternate_chains
            .iter()
            .filter(|chain| chain.contains(&ancestor.id))
            .count();
        if containing >= 3 {
            return Some(ancestor);
        }
    }
    None
}

/// Walks parents while their score keeps rising; stops once a parent
/// drops below a third of the leader's score or the rise ends.
fn climb_rising_parents<'a>(pick: &NodeRef<'a>, scores: &Scores) -> NodeRef<'a> {
    let leader_score = scores.get(&pick.id).copied().unwrap_or(0.0);
    let floor = leader_score / 3.0;
    let mut current = pick.clone();
    let mut last_score = leader_score;

    let mut parent = current.parent();
    while let Some(candidate) = parent {
        if !candidate.is_element() || node_name(&candidate) == "body" {
            break;
        }
        let Some(&score) = scores.get(&candidate.id) else {
            parent = candidate.parent();
            continue;
        };
        if score < floor {
            break;
        }
        if score > last_score {
            last_score = score;
            current = candidate.clone();
            parent = candidate.parent();
        } else {
            break;
        }
    }
    current
}

fn climb_only_children<'a>(pick: &NodeRef<'a>) -> NodeRef<'a> {
    let mut current = pick.clone();
    while let Some(parent) = current.parent() {
        if !parent.is_element() || node_name(&parent) == "body" {
            break;
        }
        if element_children(&parent).len() == 1 {
            current = parent;
        } else {
            break;
        }
    }
    current
}

fn has_sentence_content(text: &str) -> bool {
    text.contains(". ") || text.trim_end().ends_with('.')
}

/// Appends qualifying siblings of the pick, retagging anything other
/// than div/article/section/p to `<div>`.
fn merge_siblings(pick: &NodeRef, scores: &Scores) -> String {
    let pick_score = scores.get(&pick.id).copied().unwrap_or(0.0);
    let threshold = 10.0f64.max(pick_score * 0.2);
    let pick_class = node_attr(pick, "class").unwrap_or_default();

    let Some(parent) = pick.parent() else {
        return Selection::from(pick.clone()).html().to_string();
    };

    let mut output = String::new();
    for sibling in element_children(&parent) {
        let include = if sibling.id == pick.id {
            true
        } else {
            let sibling_score = scores.get(&sibling.id).copied().unwrap_or(0.0);
            let class_bonus = {
                let sibling_class = node_attr(&sibling, "class").unwrap_or_default();
                if !pick_class.is_empty() && sibling_class == pick_class {
                    pick_score * 0.2
                } else {
                    0.0
                }
            };
            if sibling_score + class_bonus >= threshold {
                true
            } else if node_name(&sibling) == "p" {
                let sel = Selection::from(sibling.clone());
                let text = inner_text(&sel);
                let len = text.chars().count();
                let density = link_density(&sel);
                (len > 80 && density < 0.25)
                    || (len > 0 && len < 80 && density == 0.0 && has_sentence_content(&text))
            } else {
                false
            }
        };

        if include {
            let name = node_name(&sibling);
            if !matches!(name.as_str(), "div" | "article" | "section" | "p") {
                Selection::from(sibling.clone()).rename("div");
            }
            output.push_str(&Selection::from(sibling).html());
        }
    }
    output
}

/// Preps the merged content and wraps it under the page container.
fn prep_and_wrap(merged: &str, flags: CleanupFlags) -> Attempt {
    let doc = Document::from(merged);
    let body = doc.select("body");
    prep::prepare_article(
        &body,
        PrepFlags {
            weight_classes: flags.contains(CleanupFlags::WEIGHT_CLASSES),
            clean_conditionally: flags.contains(CleanupFlags::CLEAN_CONDITIONALLY),
        },
    );
    let inner = body.inner_html().to_string();
    let text_len = inner_text(&body).chars().count();
    Attempt {
        html: format!(
            "<div id=\"readability-page-1\" class=\"page\">{}</div>",
            inner
        ),
        text_len,
    }
}
