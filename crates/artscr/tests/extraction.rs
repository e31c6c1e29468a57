// ABOUTME: End-to-end extraction scenarios: election shapes, metadata reconciliation, output invariants.
// ABOUTME: Exercises the public Extractor API the way the CLI and library consumers do.

use artscr::{Extractor, ExtractorBuilder};

const SENTENCE: &str =
    "The committee published its findings today, noting steady progress, and further detail on every open item.";

fn paragraphs(n: usize) -> String {
    (0..n).map(|_| format!("<p>{}</p>", SENTENCE)).collect()
}

fn extractor() -> Extractor {
    ExtractorBuilder::new().char_threshold(200).build()
}

#[test]
fn scattered_sections_elect_enclosing_main() {
    let section = format!("<section>{}</section>", paragraphs(4));
    let html = format!(
        "<html><body><main>{}</main></body></html>",
        section.repeat(5)
    );
    let report = extractor().find_candidate(&html).unwrap();
    assert!(report.path.ends_with("main"), "path was {}", report.path);
}

#[test]
fn dominant_article_beats_sidebars() {
    let sidebar = "<div><p>A short promo.</p><p>Another line.</p></div>";
    let html = format!(
        "<html><body><article>{}</article>{}</body></html>",
        paragraphs(30),
        sidebar.repeat(4)
    );
    let report = extractor().find_candidate(&html).unwrap();
    assert!(report.path.ends_with("article"));

    let article = extractor().parse(&html).unwrap();
    assert!(article.content.contains("steady progress"));
    assert!(!article.content.contains("short promo"));
}

#[test]
fn deeply_wrapped_article_is_found() {
    let html = format!(
        "<html><body><div><div><div><article>{}</article></div></div></div></body></html>",
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert!(article.content.contains("steady progress"));
    assert!(article.length > 500);
}

#[test]
fn title_normalised_from_hierarchical_separator() {
    let html = format!(
        "<html><head><title>Foo Bar Baz — Acme</title></head><body><h1>Foo Bar Baz</h1><article>{}</article></body></html>",
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert_eq!(article.title.as_deref(), Some("Foo Bar Baz"));
}

#[test]
fn json_ld_headline_wins_over_og_title() {
    let html = format!(
        concat!(
            "<html><head>",
            r#"<script type="application/ld+json">{{"@context":"https://schema.org","@type":"NewsArticle","headline":"Real Title","name":"Site Name"}}</script>"#,
            r#"<meta property="og:title" content="Real Title | Site">"#,
            "</head><body><article>{}</article></body></html>"
        ),
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert_eq!(article.title.as_deref(), Some("Real Title"));
}

#[test]
fn lazy_image_repaired_into_srcset() {
    let html = format!(
        "<html><body><article>{}<img data-src='x.jpg 2x'></article></body></html>",
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert!(article.content.contains("srcset=\"x.jpg 2x\""));
}

#[test]
fn single_cell_table_collapses_to_paragraph() {
    let html = format!(
        "<html><body><article>{}<table><tbody><tr><td><p>The full minutes, as published, appear in the journal.</p></td></tr></tbody></table></article></body></html>",
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert!(!article.content.contains("<table"));
    assert!(article.content.contains("full minutes"));
}

#[test]
fn retry_ladder_recovers_content_hidden_by_strip_unlikelys() {
    // Everything lives under a class the first pass strips; a later pass
    // must relax and return the text.
    let html = format!(
        "<html><body><div class='sidebar'>{}</div></body></html>",
        paragraphs(10)
    );
    let article = ExtractorBuilder::new()
        .char_threshold(500)
        .build()
        .parse(&html)
        .unwrap();
    assert!(article.length >= 500);
    assert!(article.content.contains("steady progress"));
}

#[test]
fn output_wrapper_carries_page_identity() {
    let article = extractor()
        .parse(&format!(
            "<html><body><article>{}</article></body></html>",
            paragraphs(8)
        ))
        .unwrap();
    assert!(article.content.contains("id=\"readability-page-1\""));
    assert!(article.content.contains("class=\"page\""));
}

#[test]
fn no_javascript_links_in_output() {
    let html = format!(
        "<html><body><article>{}<p><a href='javascript:void(0)'>share this</a></p></article></body></html>",
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert!(!article.content.contains("javascript:"));
    assert!(article.content.contains("share this"));
}

#[test]
fn presentational_attributes_absent_from_output() {
    let html = format!(
        "<html><body><article align='center' bgcolor='red'>{}</article></body></html>",
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert!(!article.content.contains("align="));
    assert!(!article.content.contains("bgcolor="));
}

#[test]
fn kept_tables_are_marked() {
    let row = "<tr><td>a</td><td>b</td><td>c</td><td>d</td><td>e</td></tr>";
    let html = format!(
        "<html><body><article>{}<table><thead><tr><th>h</th></tr></thead><tbody>{}</tbody></table></article></body></html>",
        paragraphs(8),
        row.repeat(3)
    );
    let article = extractor().parse(&html).unwrap();
    assert!(article.content.contains("_readabilitydatatable=\"true\""));
}

#[test]
fn classes_restricted_to_preserved_set() {
    let html = format!(
        "<html><body><article class='story'><p class='caption'>a caption line</p>{}</article></body></html>",
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert!(!article.content.contains("story"));
    assert!(article.content.contains("class=\"caption\""));
}

#[test]
fn extraction_is_idempotent_on_its_own_output() {
    let first = extractor()
        .parse(&format!(
            "<html><body><article>{}</article></body></html>",
            paragraphs(8)
        ))
        .unwrap();
    let second = extractor()
        .parse(&format!(
            "<html><body>{}</body></html>",
            first.content
        ))
        .unwrap();
    let diff = first.length.abs_diff(second.length);
    assert!(diff <= 1, "lengths diverged: {} vs {}", first.length, second.length);
}

#[test]
fn metadata_fields_round_out_the_article() {
    let html = format!(
        concat!(
            "<html lang='en-GB'><head>",
            "<title>A Properly Long Example Headline Here - Site</title>",
            "<meta name='author' content='Jane Roe'>",
            "<meta property='og:site_name' content='Example Site'>",
            "<meta property='og:description' content='What the piece is about.'>",
            "<meta property='article:published_time' content='2024-06-15T12:00:00Z'>",
            "</head><body><article>{}</article></body></html>"
        ),
        paragraphs(8)
    );
    let article = extractor().parse(&html).unwrap();
    assert_eq!(article.byline.as_deref(), Some("Jane Roe"));
    assert_eq!(article.site_name.as_deref(), Some("Example Site"));
    assert_eq!(article.excerpt.as_deref(), Some("What the piece is about."));
    assert_eq!(article.language.as_deref(), Some("en"));
    assert_eq!(article.direction.as_deref(), Some("ltr"));
    assert!(article.published.is_some());
}

#[test]
fn try_parse_absorbs_absence() {
    let extractor = extractor();
    assert!(extractor.try_parse("<html><body></body></html>").is_none());
    assert!(extractor
        .try_parse("<html><body><p>too small</p></body></html>")
        .is_none());
}
