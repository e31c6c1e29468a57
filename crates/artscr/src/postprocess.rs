// ABOUTME: Post-processing of the elected content: URL absolutisation, container simplification, class stripping.
// ABOUTME: Also derives the excerpt fallback from the first paragraph.

use dom_query::{NodeRef, Selection};

use crate::dom::{element_children, inner_text, node_attr, node_name, significant_child_count};
use crate::urls::DocumentUrl;

/// Runs the full §-final pass over the content selection, in place.
pub fn postprocess_content(
    content: &Selection,
    document_url: Option<&DocumentUrl>,
    classes_to_preserve: &[String],
    keep_classes: bool,
) {
    neutralise_javascript_links(content);
    if let Some(url) = document_url {
        fix_relative_urls(content, url);
    }
    simplify_nested_elements(content);
    if !keep_classes {
        strip_classes(content, classes_to_preserve);
    }
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `javascript:` links carry no destination; a lone text child becomes a
/// bare text node, anything richer keeps its children under a span.
fn neutralise_javascript_links(content: &Selection) {
    let anchors: Vec<NodeRef> = content.select("a[href]").nodes().iter().cloned().collect();
    for anchor in anchors {
        let href = node_attr(&anchor, "href").unwrap_or_default();
        if !href.trim_start().to_lowercase().starts_with("javascript:") {
            continue;
        }
        let sel = Selection::from(anchor.clone());
        let children: Vec<NodeRef> = anchor.children_it(false).collect();
        if children.len() == 1 && children[0].is_text() {
            let text = children[0].text().to_string();
            sel.replace_with_html(escape_text(&text).as_str());
        } else {
            let inner = sel.inner_html().to_string();
            sel.replace_with_html(format!("<span>{}</span>", inner).as_str());
        }
    }
}

fn fix_relative_urls(content: &Selection, url: &DocumentUrl) {
    for attr in ["href", "src", "poster"] {
        let nodes: Vec<NodeRef> = content
            .select(&format!("[{}]", attr))
            .nodes()
            .iter()
            .cloned()
            .collect();
        for node in nodes {
            let Some(value) = node_attr(&node, attr) else {
                continue;
            };
            if let Some(absolute) = url.try_make_absolute(&value) {
                Selection::from(node).set_attr(attr, &absolute);
            }
        }
    }

    let nodes: Vec<NodeRef> = content.select("[srcset]").nodes().iter().cloned().collect();
    for node in nodes {
        let Some(value) = node_attr(&node, "srcset") else {
            continue;
        };
        if let Some(absolute) = url.try_make_srcset_absolute(&value) {
            Selection::from(node).set_attr("srcset", &absolute);
        }
    }
}

fn keeps_identity(node: &NodeRef) -> bool {
    node_attr(node, "id")
        .map(|id| id.starts_with("readability"))
        .unwrap_or(false)
}

/// Removes empty div/section shells and collapses single-child
/// `div > div` / `section > section` pairs by lifting the child.
fn simplify_nested_elements(content: &Selection) {
    let nodes: Vec<NodeRef> = content
        .select("div, section")
        .nodes()
        .iter()
        .cloned()
        .collect();
    // Innermost first, so a collapse cannot orphan a pending node.
    for node in nodes.into_iter().rev() {
        let name = node_name(&node);
        if keeps_identity(&node) {
            continue;
        }
        if significant_child_count(&node) == 0 && node.text().trim().is_empty() {
            Selection::from(node).remove();
            continue;
        }
        let children = element_children(&node);
        if children.len() == 1
            && node_name(&children[0]) == name
            && significant_child_count(&node) == 1
        {
            let child_sel = Selection::from(children[0].clone());
            let replacement = child_sel.html().to_string();
            Selection::from(node).replace_with_html(replacement.as_str());
        }
    }
}

fn strip_classes(content: &Selection, classes_to_preserve: &[String]) {
    let nodes: Vec<NodeRef> = content.select("[class]").nodes().iter().cloned().collect();
    for node in nodes {
        let Some(class) = node_attr(&node, "class") else {
            continue;
        };
        let kept: Vec<&str> = class
            .split_whitespace()
            .filter(|token| {
                *token == "page" || classes_to_preserve.iter().any(|keep| keep == token)
            })
            .collect();
        let sel = Selection::from(node);
        if kept.is_empty() {
            sel.remove_attr("class");
        } else {
            sel.set_attr("class", &kept.join(" "));
        }
    }
}

/// First non-empty paragraph text, the excerpt of last resort.
pub fn derive_excerpt(content: &Selection) -> Option<String> {
    for paragraph in content.select("p").iter() {
        let text = inner_text(&paragraph);
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_query::Document;
    use pretty_assertions::assert_eq;

    fn run(html: &str, url: Option<&str>, preserve: &[&str], keep: bool) -> String {
        let doc = Document::from(html);
        let body = doc.select("body");
        let document_url = url.and_then(DocumentUrl::parse);
        let preserve: Vec<String> = preserve.iter().map(|s| s.to_string()).collect();
        postprocess_content(&body, document_url.as_ref(), &preserve, keep);
        body.inner_html().to_string()
    }

    #[test]
    fn test_relative_urls_absolutised() {
        let out = run(
            "<html><body><a href='/x'>a</a><img src='y.png'><video poster='./p.jpg'></video></body></html>",
            Some("https://example.com/blog/post.html"),
            &[],
            true,
        );
        assert!(out.contains("https://example.com/x"));
        assert!(out.contains("https://example.com/blog/y.png"));
        assert!(out.contains("https://example.com/blog/p.jpg"));
    }

    #[test]
    fn test_fragment_links_left_alone() {
        let out = run(
            "<html><body><a href='#notes'>notes</a></body></html>",
            Some("https://example.com/a"),
            &[],
            true,
        );
        assert!(out.contains("href=\"#notes\""));
    }

    #[test]
    fn test_srcset_absolutised() {
        let out = run(
            "<html><body><img srcset='a.jpg 1x, b.jpg 2x'></body></html>",
            Some("https://example.com/dir/page"),
            &[],
            true,
        );
        assert!(out.contains("https://example.com/dir/a.jpg 1x"));
        assert!(out.contains("https://example.com/dir/b.jpg 2x"));
    }

    #[test]
    fn test_javascript_link_single_text_child() {
        let out = run(
            "<html><body><p><a href='javascript:void(0)'>click me</a></p></body></html>",
            None,
            &[],
            true,
        );
        assert!(!out.contains("<a"));
        assert!(out.contains("click me"));
    }

    #[test]
    fn test_javascript_link_rich_children_become_span() {
        let out = run(
            "<html><body><a href='javascript:go()'><b>bold</b> tail</a></body></html>",
            None,
            &[],
            true,
        );
        assert!(!out.contains("<a"));
        assert!(out.contains("<span><b>bold</b> tail</span>"));
    }

    #[test]
    fn test_empty_containers_removed() {
        let out = run(
            "<html><body><div></div><section>  </section><div><p>kept</p></div></body></html>",
            None,
            &[],
            true,
        );
        assert_eq!(out.matches("<div").count(), 1);
        assert!(!out.contains("<section"));
    }

    #[test]
    fn test_readability_container_kept() {
        let out = run(
            "<html><body><div id='readability-page-1' class='page'></div></body></html>",
            None,
            &[],
            true,
        );
        assert!(out.contains("readability-page-1"));
    }

    #[test]
    fn test_nested_single_div_collapsed() {
        let out = run(
            "<html><body><div id='outer'><div id='inner'><p>text</p></div></div></body></html>",
            None,
            &[],
            true,
        );
        assert!(!out.contains("outer"));
        assert!(out.contains("inner"));
    }

    #[test]
    fn test_classes_stripped_to_preserved_set() {
        let out = run(
            "<html><body><div class='page extra'><p class='caption other'>x</p><p class='junk'>y</p></div></body></html>",
            None,
            &["caption"],
            false,
        );
        assert!(out.contains("class=\"page\""));
        assert!(out.contains("class=\"caption\""));
        assert!(!out.contains("junk"));
        assert!(!out.contains("extra"));
    }

    #[test]
    fn test_keep_classes_leaves_everything() {
        let out = run(
            "<html><body><p class='anything'>x</p></body></html>",
            None,
            &[],
            true,
        );
        assert!(out.contains("class=\"anything\""));
    }

    #[test]
    fn test_derive_excerpt() {
        let doc = Document::from("<html><body><p>  </p><p>First real paragraph.</p></body></html>");
        let body = doc.select("body");
        assert_eq!(
            derive_excerpt(&body).as_deref(),
            Some("First real paragraph.")
        );
    }

    #[test]
    fn test_derive_excerpt_none() {
        let doc = Document::from("<html><body><div>no paragraphs</div></body></html>");
        let body = doc.select("body");
        assert!(derive_excerpt(&body).is_none());
    }
}
