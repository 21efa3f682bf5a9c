//! Pre-pass: normalise HTML before tokenisation.
//!
//! Page HTML is full of layout wrappers that carry no Markdown meaning.
//! Removing them up front keeps the structural converter small:
//!
//! 1. `<style>` blocks are dropped with their contents
//! 2. `<div>` opening tags are dropped; each run of closing `</div>` tags
//!    becomes one paragraph break
//! 3. inline `style="…"` attributes are dropped, except on `th`/`td` where a
//!    `text-align` declaration still carries column alignment
//! 4. `<span>` tags are dropped, their contents kept
//!
//! Entity decoding is left to the tokenizer so that escaped markup
//! (`&lt;b&gt;`) stays text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub fn normalise_html(input: &str) -> String {
    let s = strip_style_blocks(input);
    let s = strip_div_wrappers(&s);
    let s = strip_style_attributes(&s);
    strip_spans(&s)
}

// ── Rule 1: style blocks ─────────────────────────────────────────────────────

static RE_STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());

fn strip_style_blocks(input: &str) -> String {
    RE_STYLE_BLOCK.replace_all(input, "").into_owned()
}

// ── Rule 2: div wrappers ─────────────────────────────────────────────────────

static RE_DIV_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<div\b[^>]*>").unwrap());
static RE_DIV_CLOSE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</div\s*>(?:\s*</div\s*>)*").unwrap());

fn strip_div_wrappers(input: &str) -> String {
    let s = RE_DIV_OPEN.replace_all(input, "");
    RE_DIV_CLOSE_RUN.replace_all(&s, "\n\n").into_owned()
}

// ── Rule 3: inline style attributes ──────────────────────────────────────────

static RE_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<([a-z][a-z0-9]*)(\s[^>]*)>").unwrap());
static RE_STYLE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+style\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap());

fn strip_style_attributes(input: &str) -> String {
    RE_OPEN_TAG
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            let attrs = &caps[2];
            let keeps_style = name.eq_ignore_ascii_case("th") || name.eq_ignore_ascii_case("td");
            if keeps_style || !RE_STYLE_ATTR.is_match(attrs) {
                caps[0].to_string()
            } else {
                format!("<{}{}>", name, RE_STYLE_ATTR.replace_all(attrs, ""))
            }
        })
        .into_owned()
}

// ── Rule 4: spans ────────────────────────────────────────────────────────────

static RE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?span\b[^>]*>").unwrap());

fn strip_spans(input: &str) -> String {
    RE_SPAN.replace_all(input, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_style_block() {
        let input = "<style type=\"text/css\">\np { color: red }\n</style><p>x</p>";
        assert_eq!(strip_style_blocks(input), "<p>x</p>");
    }

    #[test]
    fn test_div_runs_collapse() {
        let input = "<div class=\"a\"><div>one</div></div>\n</div><div>two</div>";
        assert_eq!(strip_div_wrappers(input), "one\n\ntwo\n\n");
    }

    #[test]
    fn test_divider_is_not_a_div() {
        let input = "<divider>x</divider>";
        assert_eq!(strip_div_wrappers(input), input);
    }

    #[test]
    fn test_style_attribute_removed() {
        let input = "<p style=\"color: red\" class=\"x\">a</p>";
        assert_eq!(strip_style_attributes(input), "<p class=\"x\">a</p>");
    }

    #[test]
    fn test_style_attribute_kept_on_cells() {
        let input = "<td style=\"text-align: right\">1</td>";
        assert_eq!(strip_style_attributes(input), input);
    }

    #[test]
    fn test_spans_stripped_content_kept() {
        assert_eq!(
            strip_spans("<span class=\"k\">let</span> x"),
            "let x"
        );
    }

    #[test]
    fn test_entities_untouched() {
        let input = "<p>&lt;b&gt; &amp;</p>";
        assert_eq!(normalise_html(input), input);
    }
}
