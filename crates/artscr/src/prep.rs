// ABOUTME: Presentation prep over the elected article subtree.
// ABOUTME: Strips presentational noise, repairs lazy images, marks data tables, and prunes fishy blocks.

use dom_query::{NodeRef, Selection};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::scoring::{class_weight, count_commas};
use crate::dom::{
    self, element_children, has_ancestor_tag, inner_text, is_phrasing_content, node_attr,
    node_name,
};
use crate::urls::DataUrl;

pub const DATA_TABLE_ATTR: &str = "_readabilitydatatable";

const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "align",
    "background",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "frame",
    "hspace",
    "rules",
    "style",
    "valign",
    "vspace",
];

const DEPRECATED_SIZE_TAGS: &[&str] = &["table", "th", "td", "hr", "pre"];

pub const VIDEO_HOSTS: &[&str] = &[
    "dailymotion.com",
    "youtube.com",
    "youtube-nocookie.com",
    "player.vimeo.com",
    "v.qq.com",
    "archive.org",
    "upload.wikimedia.org",
    "player.twitch.tv",
];

static SHARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\b|_)(share|sharedaddy)(\b|_)").unwrap());

static IMG_EXT_WITH_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)\s+\d").unwrap());
static IMG_EXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$").unwrap());

/// Cleanup switches carried through an attempt (see the retry loop).
#[derive(Debug, Clone, Copy)]
pub struct PrepFlags {
    pub weight_classes: bool,
    pub clean_conditionally: bool,
}

impl Default for PrepFlags {
    fn default() -> Self {
        Self {
            weight_classes: true,
            clean_conditionally: true,
        }
    }
}

/// Applies the full presentation prep to the elected subtree, in place.
pub fn prepare_article(article: &Selection, flags: PrepFlags) {
    strip_presentational_attributes(article);
    mark_data_tables(article);
    fix_lazy_images(article);
    if flags.clean_conditionally {
        for tag in ["form", "fieldset", "table", "ul", "div"] {
            clean_conditionally(article, tag, flags.weight_classes);
        }
    }
    remove_unwanted_tags(article);
    sweep_share_widgets(article);
    clean_headers(article, flags.weight_classes);
    demote_h1(article);
    remove_empty_paragraphs(article);
    remove_br_before_paragraph(article);
    collapse_single_cell_tables(article);
}

fn snapshot<'a>(sel: &Selection<'a>, selector: &str) -> Vec<NodeRef<'a>> {
    sel.select(selector).nodes().iter().cloned().collect()
}

fn strip_presentational_attributes(article: &Selection) {
    let mut nodes: Vec<NodeRef> = article.nodes().to_vec();
    nodes.extend(snapshot(article, "*"));
    for node in nodes {
        let name = node_name(&node);
        if name == "svg" || has_ancestor_tag(&node, "svg") {
            continue;
        }
        let sel = Selection::from(node.clone());
        for attr in PRESENTATIONAL_ATTRIBUTES {
            sel.remove_attr(attr);
        }
        if DEPRECATED_SIZE_TAGS.contains(&name.as_str()) {
            sel.remove_attr("width");
            sel.remove_attr("height");
        }
    }
}

/// Row and column span over a table, honouring rowspan/colspan (min 1).
fn table_dimensions(table: &NodeRef) -> (usize, usize) {
    let sel = Selection::from(table.clone());
    let mut rows = 0usize;
    let mut columns = 0usize;
    for row in sel.select("tr").iter() {
        let rowspan = row
            .attr("rowspan")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        rows += rowspan;
        let mut row_cols = 0usize;
        for cell in row.select("td, th").iter() {
            let colspan = cell
                .attr("colspan")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            row_cols += colspan;
        }
        columns = columns.max(row_cols);
    }
    (rows, columns)
}

fn classify_data_table(table: &NodeRef) -> bool {
    if node_attr(table, "role").map_or(false, |r| r.eq_ignore_ascii_case("presentation")) {
        return false;
    }
    if node_attr(table, "datatable").as_deref() == Some("0") {
        return false;
    }
    if dom::has_attr(table, "summary") {
        return true;
    }
    let sel = Selection::from(table.clone());
    let caption = sel.select("caption");
    if caption.length() > 0 && !caption.text().trim().is_empty() {
        return true;
    }
    if sel.select("col, colgroup, tfoot, thead, th").length() > 0 {
        return true;
    }
    if sel.select("table").length() > 0 {
        return false;
    }
    let (rows, columns) = table_dimensions(table);
    if rows >= 10 || columns > 4 {
        return true;
    }
    rows * columns > 10
}

fn mark_data_tables(article: &Selection) {
    let mut tables: Vec<NodeRef> = article
        .nodes()
        .iter()
        .filter(|node| node_name(node) == "table")
        .cloned()
        .collect();
    tables.extend(snapshot(article, "table"));
    for node in tables {
        let verdict = classify_data_table(&node);
        let sel = Selection::from(node);
        sel.set_attr(DATA_TABLE_ATTR, if verdict { "true" } else { "false" });
    }
}

fn is_data_table(node: &NodeRef) -> bool {
    node_attr(node, DATA_TABLE_ATTR).as_deref() == Some("true")
}

fn has_data_table_ancestor(node: &NodeRef) -> bool {
    dom::ancestors(node, None).iter().any(is_data_table)
}

/// A value such as `photo.jpg 2x` targets srcset; a bare image path
/// targets src. Each extension probe records its own match position.
fn image_attribute_target(value: &str) -> Option<&'static str> {
    if IMG_EXT_WITH_SIZE_RE.is_match(value) {
        return Some("srcset");
    }
    if IMG_EXT_RE.is_match(value) {
        return Some("src");
    }
    None
}

fn references_image(value: &str) -> bool {
    IMG_EXT_WITH_SIZE_RE.is_match(value) || IMG_EXT_RE.is_match(value)
}

fn fix_lazy_images(article: &Selection) {
    for node in snapshot(article, "img, picture, figure") {
        let sel = Selection::from(node.clone());
        let name = node_name(&node);

        // A tiny base64 placeholder loses to any attribute that names a
        // real image file.
        if let Some(src) = node_attr(&node, "src") {
            if let Some(data_url) = DataUrl::parse(&src) {
                if data_url.is_base64() && data_url.data_len() < 133 {
                    let has_real_image = node.attrs().iter().any(|attr| {
                        !attr.name.local.as_ref().eq_ignore_ascii_case("src")
                            && references_image(&attr.value)
                    });
                    if has_real_image {
                        sel.remove_attr("src");
                    }
                }
            }
        }

        let src = node_attr(&node, "src");
        let srcset = node_attr(&node, "srcset");
        let has_src = src.map_or(false, |v| !v.is_empty());
        let has_srcset = srcset.as_deref().map_or(false, |v| !v.is_empty() && v != "null");
        let lazy_class = node_attr(&node, "class")
            .map_or(false, |c| c.to_lowercase().contains("lazy"));
        if (has_src || has_srcset) || lazy_class {
            continue;
        }

        for attr in node.attrs() {
            let attr_name = attr.name.local.to_string();
            if matches!(attr_name.as_str(), "src" | "srcset" | "alt") {
                continue;
            }
            let value = attr.value.to_string();
            let Some(target) = image_attribute_target(&value) else {
                continue;
            };
            if name == "img" || name == "picture" {
                sel.set_attr(target, &value);
            } else if name == "figure" && sel.select("img, picture").length() == 0 {
                sel.append_html(format!("<img {}=\"{}\">", target, escape_attr(&value)));
            }
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn is_video_embed(node: &NodeRef) -> bool {
    node.attrs().iter().any(|attr| {
        let value = attr.value.to_lowercase();
        VIDEO_HOSTS.iter().any(|host| value.contains(host))
    })
}

fn embed_count_ignoring_video(sel: &Selection) -> (usize, bool) {
    let mut count = 0usize;
    let mut has_video = false;
    for embed in sel.select("object, embed, iframe").nodes() {
        if is_video_embed(embed) {
            has_video = true;
        } else {
            count += 1;
        }
    }
    (count, has_video)
}

fn heading_density(sel: &Selection) -> f64 {
    let total = inner_text(sel).chars().count();
    if total == 0 {
        return 0.0;
    }
    let heading_len: usize = sel
        .select("h1, h2, h3, h4, h5, h6")
        .iter()
        .map(|h| inner_text(&h).chars().count())
        .sum();
    heading_len as f64 / total as f64
}

/// Image-gallery lists, every item holding exactly one image, are exempt
/// from the list heuristics.
fn is_image_gallery_list(sel: &Selection) -> bool {
    let items: Vec<_> = sel.select("li").nodes().iter().cloned().collect();
    !items.is_empty()
        && items.iter().all(|li| {
            let li_sel = Selection::from(li.clone());
            li_sel.select("img").length() == 1
        })
}

fn should_remove_conditionally(node: &NodeRef, weight_classes: bool) -> bool {
    let sel = Selection::from(node.clone());
    let name = node_name(node);
    let is_list = matches!(name.as_str(), "ul" | "ol");

    let weight = class_weight(node, weight_classes);
    if weight < 0 {
        return true;
    }

    let text = inner_text(&sel);
    if count_commas(&text) >= 10 {
        return false;
    }

    let paragraphs = sel.select("p").length();
    let images = sel.select("img").length();
    let list_items = sel.select("li").length() as isize - 100;
    let inputs = sel.select("input").length();
    let content_len = text.chars().count();
    let density = dom::link_density(&sel);
    let headings = heading_density(&sel);
    let (embeds, has_video) = embed_count_ignoring_video(&sel);

    if has_video {
        return false;
    }
    if is_list && is_image_gallery_list(&sel) {
        return false;
    }

    let in_figure = has_ancestor_tag(node, "figure");

    let remove = (images > 1
        && (paragraphs as f64 / images as f64) < 0.5
        && !in_figure)
        || (!is_list && list_items > paragraphs as isize)
        || (inputs > paragraphs / 3)
        || (!is_list
            && headings < 0.9
            && content_len < 25
            && (images == 0 || images > 2)
            && !in_figure)
        || (!is_list && weight < 25 && density > 0.2)
        || (weight >= 25 && density > 0.5)
        || ((embeds == 1 && content_len < 75) || embeds > 1);

    remove
}

fn clean_conditionally(article: &Selection, tag: &str, weight_classes: bool) {
    for node in snapshot(article, tag) {
        if node_name(&node) == "table" && is_data_table(&node) {
            continue;
        }
        if has_data_table_ancestor(&node) || has_ancestor_tag(&node, "code") {
            continue;
        }
        if should_remove_conditionally(&node, weight_classes) {
            debug!("conditionally removing <{}>", tag);
            Selection::from(node).remove();
        }
    }
}

fn remove_unwanted_tags(article: &Selection) {
    for tag in [
        "object", "embed", "footer", "link", "aside", "iframe", "input", "textarea", "select",
        "button",
    ] {
        for node in snapshot(article, tag) {
            if matches!(tag, "object" | "embed" | "iframe") && is_video_embed(&node) {
                continue;
            }
            Selection::from(node).remove();
        }
    }
}

fn sweep_share_widgets(article: &Selection) {
    for root in article.nodes() {
        for child in dom::element_children(root) {
            sweep_share_in(&child);
        }
    }
}

fn sweep_share_in(node: &NodeRef) {
    let mut matched: Vec<NodeRef> = Vec::new();
    collect_share_nodes(node, &mut matched);
    for hit in matched {
        let sel = Selection::from(hit);
        if inner_text(&sel).chars().count() < 500 {
            sel.remove();
        }
    }
}

fn collect_share_nodes<'a>(node: &NodeRef<'a>, out: &mut Vec<NodeRef<'a>>) {
    let class = node_attr(node, "class").unwrap_or_default();
    let id = node_attr(node, "id").unwrap_or_default();
    if SHARE_RE.is_match(&class) || SHARE_RE.is_match(&id) {
        out.push(node.clone());
        return;
    }
    for child in element_children(node) {
        collect_share_nodes(&child, out);
    }
}

fn clean_headers(article: &Selection, weight_classes: bool) {
    for node in snapshot(article, "h1, h2") {
        if class_weight(&node, weight_classes) < 0 {
            Selection::from(node).remove();
        }
    }
}

fn demote_h1(article: &Selection) {
    for node in snapshot(article, "h1") {
        Selection::from(node).rename("h2");
    }
}

fn remove_empty_paragraphs(article: &Selection) {
    for node in snapshot(article, "p") {
        let sel = Selection::from(node);
        if !sel.text().trim().is_empty() {
            continue;
        }
        if sel.select("img, embed, object, iframe").length() > 0 {
            continue;
        }
        sel.remove();
    }
}

fn remove_br_before_paragraph(article: &Selection) {
    for node in snapshot(article, "br") {
        let mut next = node.next_sibling();
        while let Some(sibling) = next {
            if sibling.is_text() && sibling.text().trim().is_empty() {
                next = sibling.next_sibling();
                continue;
            }
            if sibling.is_element() && node_name(&sibling) == "p" {
                Selection::from(node).remove();
            }
            break;
        }
    }
}

fn collapse_single_cell_tables(article: &Selection) {
    for table in snapshot(article, "table") {
        let mut current = table.clone();
        // Descend table > tbody > tr > td, each step requiring a sole child.
        let mut cell: Option<NodeRef> = None;
        loop {
            let children = element_children(&current);
            if children.len() != 1 {
                break;
            }
            let only = children[0].clone();
            match node_name(&only).as_str() {
                "tbody" | "tr" => current = only,
                "td" => {
                    cell = Some(only);
                    break;
                }
                _ => break,
            }
        }
        let Some(cell) = cell else {
            continue;
        };
        let all_phrasing = cell
            .children_it(false)
            .all(|child| is_phrasing_content(&child));
        let cell_sel = Selection::from(cell);
        cell_sel.rename(if all_phrasing { "p" } else { "div" });
        cell_sel.remove_attr(DATA_TABLE_ATTR);
        let replacement = cell_sel.html().to_string();
        Selection::from(table).replace_with_html(replacement.as_str());
    }
}
