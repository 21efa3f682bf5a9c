//! Markdown → HTML → Markdown round trips.
//!
//! The two converters are independent, so a round trip is only exact for
//! the structure both of them cover. These tests pin that common subset.

use mdbridge::{html_to_markdown, markdown_to_html, ConversionOptions};

fn round_trip(md: &str) -> String {
    let options = ConversionOptions::default();
    html_to_markdown(&markdown_to_html(md, &options), &options)
}

#[test]
fn test_heading_and_paragraph() {
    let md = "# Title\n\nSome **bold** text and a [link](https://example.com).";
    assert_eq!(round_trip(md), md);
}

#[test]
fn test_unordered_list() {
    assert_eq!(round_trip("- a\n- b\n- c"), "- a\n- b\n- c");
}

#[test]
fn test_nested_list() {
    assert_eq!(round_trip("- a\n  - b\n- c"), "- a\n  - b\n- c");
}

#[test]
fn test_task_list() {
    assert_eq!(round_trip("- [x] done\n- [ ] open"), "- [x] done\n- [ ] open");
}

#[test]
fn test_aligned_table() {
    let md = "| A | B |\n| :--- | ---: |\n| 1 | 2 |";
    assert_eq!(round_trip(md), md);
}

#[test]
fn test_fenced_code_keeps_language_and_body() {
    let out = round_trip("```rust\nfn main() {}\n```");
    assert!(out.starts_with("```rust\nfn main() {}\n"), "got: {out}");
    assert!(out.ends_with("```"), "got: {out}");
}

#[test]
fn test_image_and_strikethrough() {
    let md = "![chart](img/chart.png) ~~old~~ value";
    assert_eq!(round_trip(md), md);
}

#[test]
fn test_html_side_is_stable_after_one_trip() {
    let options = ConversionOptions::default();
    let html = "<h2>Notes</h2>\n<p>One <em>two</em> <code>three</code></p>";
    let once = markdown_to_html(&html_to_markdown(html, &options), &options);
    assert_eq!(once, html);
}
