//! Integration tests for the HTML→Markdown direction.
//!
//! Everything goes through the public entry points, the way an embedding
//! application would call them.

use mdbridge::{
    html_to_markdown, try_html_to_markdown, ConversionOptions, ConvertError, Document, TagPolicy,
};

fn md(html: &str) -> String {
    html_to_markdown(html, &ConversionOptions::default())
}

// ── Regression cases ─────────────────────────────────────────────────────────

#[test]
fn test_links() {
    let out = md(r#"<p><a href="https://example.com">Example</a></p>"#);
    assert!(out.contains("[Example](https://example.com)"), "got: {out}");
}

#[test]
fn test_task_list() {
    let out = md("<ul><li><input type='checkbox' checked> Done</li><li><input type='checkbox'> Todo</li></ul>");
    assert!(out.contains("- [x] Done"), "got: {out}");
    assert!(out.contains("- [ ] Todo"), "got: {out}");
}

#[test]
fn test_table_with_checkbox_cells() {
    let html = r#"
    <table>
      <tr><th>Name</th><th>Done</th></tr>
      <tr><td>Task A</td><td><input type="checkbox" checked></td></tr>
      <tr><td>Task B</td><td><input type="checkbox"></td></tr>
    </table>
    "#;
    let out = md(html);
    assert!(out.contains("| Name | Done |"), "got: {out}");
    assert!(out.contains("| Task A | [x] |"), "got: {out}");
    assert!(out.contains("| Task B | [ ] |"), "got: {out}");
}

// ── Whole documents ──────────────────────────────────────────────────────────

#[test]
fn test_article_page() {
    let html = r#"<!DOCTYPE html>
<html>
<head>
  <title>Release notes</title>
  <style>body { font-family: sans-serif; }</style>
</head>
<body>
  <div class="container">
    <h1>Release notes</h1>
    <p>This release adds <strong>two</strong> features.</p>
    <ol>
      <li>Faster startup</li>
      <li>Smaller binary</li>
    </ol>
    <blockquote>Upgrade at your leisure.</blockquote>
  </div>
</body>
</html>"#;
    let out = md(html);

    assert!(out.starts_with("# Release notes"), "got: {out}");
    assert_eq!(out.matches("Release notes").count(), 1, "duplicate title kept: {out}");
    assert!(out.contains("This release adds **two** features."), "got: {out}");
    assert!(out.contains("1. Faster startup\n1. Smaller binary"), "got: {out}");
    assert!(out.contains("> Upgrade at your leisure."), "got: {out}");
    assert!(!out.contains("font-family"), "style leaked: {out}");
    assert!(!out.contains("\n\n\n"), "blank lines not collapsed: {out}");
}

#[test]
fn test_code_block_keeps_indentation() {
    let html = "<pre><code class=\"language-python\">def f():\n    return 1\n</code></pre>";
    let out = md(html);
    assert!(out.starts_with("```python\ndef f():\n    return 1\n"), "got: {out}");
    assert!(out.ends_with("```"), "got: {out}");
}

#[test]
fn test_empty_links_removed() {
    let out = md(r#"<p>before <a href="x"></a>after</p>"#);
    assert_eq!(out, "before after");
}

#[test]
fn test_images_rewritten_against_base_url() {
    let options = ConversionOptions::builder()
        .base_url("https://cdn.example.com/assets/")
        .rewrite_paths(true)
        .build();
    let out = html_to_markdown(r#"<img src="logo.png" alt="Logo">"#, &options);
    assert_eq!(out, "![Logo](https://cdn.example.com/assets/logo.png)");
}

#[test]
fn test_paths_untouched_without_rewrite() {
    let options = ConversionOptions::builder().base_url("https://example.com/").build();
    let out = html_to_markdown(r#"<a href="docs/a.html">A</a>"#, &options);
    assert_eq!(out, "[A](docs/a.html)");
}

#[test]
fn test_unknown_tags_dropped_with_custom_policy() {
    let options = ConversionOptions::builder()
        .drop_unknown_tags(true)
        .tags(TagPolicy::new(["em"], ["p"]))
        .build();
    let out = html_to_markdown("<p><em>kept</em> <strong>plain</strong></p>", &options);
    assert_eq!(out, "*kept* plain");
}

// ── Failure behaviour ────────────────────────────────────────────────────────

#[test]
fn test_parse_error_returns_input_unchanged() {
    let html = "<table><th>no row</th></table>";
    assert!(matches!(
        try_html_to_markdown(html, &ConversionOptions::default()),
        Err(ConvertError::Parse(_))
    ));
    assert_eq!(md(html), html);
}

#[test]
fn test_document_wrapper() {
    let doc = Document::html("<h2>Heading</h2><p>Body</p>");
    assert_eq!(doc.convert(&ConversionOptions::default()), "## Heading\n\nBody");
}
