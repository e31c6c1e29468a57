// ABOUTME: Element-based candidate scoring and ancestor resolution.
// ABOUTME: Ranks block subtrees by token density and promotes a better enclosing element when tops scatter.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use dom_query::{Document, NodeId, NodeRef};
use log::debug;

use crate::dom::{
    self, Categories, Layout, element_children, is_probably_hidden, node_name, node_path,
    significant_child_count, tag_categories, tag_layout,
};
use crate::dom::scoring::{element_factor_for, name_weight};
use crate::tokens::{self, TokenCounts};

/// A scored block subtree. Immutable once created; `order` is the stable
/// document-order key breaking score ties.
#[derive(Debug, Clone)]
pub struct ArticleCandidate<'a> {
    pub node: NodeRef<'a>,
    pub token_count: usize,
    pub content_score: f64,
    order: usize,
}

impl<'a> ArticleCandidate<'a> {
    pub fn path(&self) -> String {
        node_path(&self.node)
    }

    pub fn nesting_level(&self) -> usize {
        dom::nesting_level(&self.node)
    }
}

/// All valid candidates of one pass plus the retained top set.
pub struct CandidateSet<'a> {
    all: Vec<ArticleCandidate<'a>>,
    /// Indices into `all`, ascending by score (worst first).
    tops: Vec<usize>,
    by_id: HashMap<NodeId, usize>,
    n_top: usize,
}

#[derive(PartialEq)]
struct HeapEntry {
    score: f64,
    order: usize,
    index: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the worst candidate
        // on top so it can be evicted. Equal scores evict later document
        // order first, keeping the earlier element.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.order.cmp(&other.order))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scores every eligible block element under `<body>` (or the document
/// root when there is no body) and retains the top `n_top` by score.
/// Returns `None` when nothing qualifies.
pub fn find_candidates(doc: &Document, n_top: usize) -> Option<CandidateSet<'_>> {
    let n_top = n_top.max(1);
    let root = scoring_root(doc)?;

    let mut all = Vec::new();
    let mut by_id = HashMap::new();

    let mut elements = vec![root.clone()];
    elements.extend(dom::descendant_elements(&root));

    for (order, element) in elements.into_iter().enumerate() {
        let Some(candidate) = score_element(&element, order) else {
            continue;
        };
        by_id.insert(candidate.node.id, all.len());
        all.push(candidate);
    }

    if all.is_empty() {
        return None;
    }

    // Bounded min-heap: the worst retained candidate sits on top and is
    // evicted as better ones arrive.
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(n_top + 1);
    for (index, candidate) in all.iter().enumerate() {
        heap.push(HeapEntry {
            score: candidate.content_score,
            order: candidate.order,
            index,
        });
        if heap.len() > n_top {
            heap.pop();
        }
    }

    // Draining the min-heap yields ascending score order, which the
    // resolver's ancestry state machine depends on.
    let mut tops = Vec::with_capacity(heap.len());
    while let Some(entry) = heap.pop() {
        tops.push(entry.index);
    }

    Some(CandidateSet {
        all,
        tops,
        by_id,
        n_top,
    })
}

fn scoring_root(doc: &Document) -> Option<NodeRef<'_>> {
    let body = doc.select("body");
    if let Some(node) = body.nodes().first() {
        return Some(node.clone());
    }
    let html = doc.select("html");
    html.nodes().first().cloned()
}

fn score_element<'a>(element: &NodeRef<'a>, order: usize) -> Option<ArticleCandidate<'a>> {
    let name = node_name(element);
    if tag_layout(&name) != Layout::Block {
        return None;
    }
    if significant_child_count(element) < 2 {
        return None;
    }
    if is_probably_hidden(element) {
        return None;
    }
    let cats = tag_categories(&name);
    if cats.intersects(Categories::METADATA | Categories::SCRIPT) {
        return None;
    }

    // An element holding article-like text directly is better represented
    // by the descendant that wraps that text.
    let direct = direct_token_counts(element);
    if direct.content() > 0 && direct.words + direct.numbers > direct.punctuation {
        return None;
    }

    let full = full_token_counts(element);
    let token_total = full.total();
    if token_total == 0 || full.punctuation >= full.words + full.numbers {
        return None;
    }
    let token_count = full.content();
    let density = token_count as f64 / token_total as f64;

    let markup_count = markup_count(element);
    let factor = element_factor_for(element) + name_weight(element);

    if token_count <= markup_count || (markup_count == 0 && factor <= 1.0) {
        return None;
    }

    let content_score = (token_count as f64 / (markup_count as f64 + (token_count as f64).log2()))
        * density
        * factor;

    Some(ArticleCandidate {
        node: element.clone(),
        token_count,
        content_score,
        order,
    })
}

fn direct_token_counts(element: &NodeRef) -> TokenCounts {
    let mut counts = TokenCounts::default();
    for child in element.children_it(false) {
        if child.is_text() {
            counts.merge(tokens::count_tokens(&child.text()));
        }
    }
    counts
}

fn full_token_counts(element: &NodeRef) -> TokenCounts {
    let mut counts = TokenCounts::default();
    let mut stack = vec![element.clone()];
    while let Some(current) = stack.pop() {
        for child in current.children_it(false) {
            if child.is_text() {
                counts.merge(tokens::count_tokens(&child.text()));
            } else if child.is_element() {
                let cats = tag_categories(&node_name(&child));
                if cats.intersects(Categories::METADATA | Categories::SCRIPT) {
                    continue;
                }
                stack.push(child);
            }
        }
    }
    counts
}

fn is_non_content(element: &NodeRef) -> bool {
    let name = node_name(element);
    if !dom::permits_phrasing(&name) {
        return true;
    }
    let cats = tag_categories(&name);
    if cats.intersects(Categories::METADATA | Categories::SCRIPT | Categories::FORM) {
        return true;
    }
    let children = element_children(element);
    !children.is_empty() && children.iter().all(is_non_content)
}

fn markup_count(element: &NodeRef) -> usize {
    let descendants = dom::descendant_elements(element)
        .iter()
        .filter(|node| is_non_content(node))
        .count();
    descendants + usize::from(is_non_content(element))
}

struct AncestorStats<'a> {
    node: NodeRef<'a>,
    reoccurrence: usize,
    nesting: usize,
}

impl<'a> CandidateSet<'a> {
    pub fn top_candidates(&self) -> impl Iterator<Item = &ArticleCandidate<'a>> + '_ {
        self.tops.iter().map(|&index| &self.all[index])
    }

    fn top(&self, position: usize) -> &ArticleCandidate<'a> {
        &self.all[self.tops[position]]
    }

    fn best(&self) -> &ArticleCandidate<'a> {
        self.top(self.tops.len() - 1)
    }

    fn candidate_for(&self, node: &NodeRef<'a>) -> Option<&ArticleCandidate<'a>> {
        self.by_id.get(&node.id).map(|&index| &self.all[index])
    }

    fn is_top(&self, node: &NodeRef<'a>) -> bool {
        self.tops
            .iter()
            .any(|&index| self.all[index].node.id == node.id)
    }

    /// Elects the article candidate: the best-scoring top unless one of
    /// the resolution branches promotes another element.
    pub fn resolve(&self) -> ArticleCandidate<'a> {
        let threshold = self.n_top.div_ceil(2);
        let pick = self.best().clone();

        // Ancestry chain over the ascending drain: a run where each
        // candidate's parent is the previously dequeued candidate.
        let mut ancestry_count = 0usize;
        let mut max_ancestry_count = 0usize;
        for i in 1..self.tops.len() {
            let parent = self.top(i).node.parent();
            let chained = parent
                .map(|p| p.id == self.top(i - 1).node.id)
                .unwrap_or(false);
            if chained {
                ancestry_count += 1;
                max_ancestry_count = max_ancestry_count.max(ancestry_count);
            } else {
                ancestry_count = 0;
            }
        }

        let ancestors = self.common_ancestors();

        let scattered = (max_ancestry_count as f64 / threshold as f64) < 0.6
            && (ancestry_count == 0 || ancestry_count != max_ancestry_count);

        if scattered {
            if let Some(promoted) =
                self.resolve_scattered(&pick, &ancestors, threshold, max_ancestry_count)
            {
                debug!("scattered-tops promoted {}", promoted.path());
                return promoted;
            }
            return pick;
        }

        if let Some(promoted) = self.resolve_dominant_outlier() {
            debug!("dominant-outlier promoted {}", promoted.path());
            return promoted;
        }

        if ancestry_count as f64 / threshold as f64 > 0.6 {
            if ancestry_count < self.tops.len() {
                let anchor = self.top(ancestry_count);
                if pick.token_count as f64 / anchor.token_count as f64 <= 0.8 {
                    debug!("deep-ancestry promoted {}", anchor.path());
                    return anchor.clone();
                }
            }
        }

        pick
    }

    /// Reoccurrence counts for every proper ancestor of a top candidate,
    /// stopping at body, ordered ascending by reoccurrence then
    /// descending by nesting level.
    fn common_ancestors(&self) -> Vec<AncestorStats<'a>> {
        let mut stats: Vec<AncestorStats<'a>> = Vec::new();
        let mut index_by_id: HashMap<NodeId, usize> = HashMap::new();
        for &top_index in &self.tops {
            let candidate = &self.all[top_index];
            for ancestor in dom::ancestors(&candidate.node, None) {
                let name = node_name(&ancestor);
                if name == "body" || name == "html" {
                    break;
                }
                match index_by_id.get(&ancestor.id) {
                    Some(&at) => stats[at].reoccurrence += 1,
                    None => {
                        index_by_id.insert(ancestor.id, stats.len());
                        stats.push(AncestorStats {
                            nesting: dom::nesting_level(&ancestor),
                            node: ancestor,
                            reoccurrence: 1,
                        });
                    }
                }
            }
        }
        stats.sort_by(|a, b| {
            a.reoccurrence
                .cmp(&b.reoccurrence)
                .then_with(|| b.nesting.cmp(&a.nesting))
        });
        stats
    }

    fn resolve_scattered(
        &self,
        pick: &ArticleCandidate<'a>,
        ancestors: &[AncestorStats<'a>],
        threshold: usize,
        max_ancestry_count: usize,
    ) -> Option<ArticleCandidate<'a>> {
        let mut token_counts: Vec<usize> =
            self.top_candidates().map(|c| c.token_count).collect();
        token_counts.sort_unstable();
        let mid_tokens = token_counts[token_counts.len() / 2];
        let max_tokens = *token_counts.last().unwrap_or(&0);
        let best_id = self.best().node.id;

        for stat in ancestors {
            let Some(candidate) = self.candidate_for(&stat.node) else {
                continue;
            };
            if candidate.token_count < pick.token_count {
                continue;
            }
            let in_tops = self.is_top(&stat.node);
            let is_best = stat.node.id == best_id;
            let reocc = stat.reoccurrence;

            let qualifies = (reocc == self.n_top && !in_tops)
                || (reocc > threshold && candidate.token_count > max_tokens)
                || (reocc == threshold && ((in_tops && max_ancestry_count > 0) || is_best))
                || (reocc < threshold && is_best && candidate.token_count >= mid_tokens);

            if qualifies {
                return Some(candidate.clone());
            }
        }
        None
    }

    fn resolve_dominant_outlier(&self) -> Option<ArticleCandidate<'a>> {
        let mut by_tokens: Vec<&ArticleCandidate<'a>> = self.all.iter().collect();
        by_tokens.sort_by(|a, b| b.token_count.cmp(&a.token_count));
        by_tokens.dedup_by(|a, b| a.token_count == b.token_count);

        for pair in by_tokens.windows(2) {
            let upper = pair[0];
            let lower = pair[1];
            if (lower.token_count as f64) / (upper.token_count as f64) < 0.15 {
                return Some(upper.clone());
            }
        }
        None
    }
}
