//! Inline stages of the Markdown→HTML renderer: images, links and emphasis.
//!
//! Links and images are resolved through the shared resolver and their tags
//! are stashed, so emphasis scanning never sees a URL. Emphasis is matched
//! by a small scanner instead of a regex because the rules need lookahead:
//! content must start and end with a non-whitespace character, and a
//! single-character delimiter does not close when the same character
//! follows it.

use crate::pipeline::render::Ctx;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(\s*([^)\s]+)(?:\s+"([^"]*)")?\s*\)"#).unwrap()
});
static RE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\]]+)\]\(\s*([^)\s]+)(?:\s+"([^"]*)")?\s*\)"#).unwrap()
});

/// Render images, links and emphasis in a span of text.
pub(crate) fn render_inline(text: &str, ctx: &mut Ctx<'_>) -> String {
    let s = images(text, ctx);
    let s = links(&s, ctx);
    emphasis(&s)
}

/// `![alt](src "title")` → stashed `<img/>`.
pub(crate) fn images(text: &str, ctx: &mut Ctx<'_>) -> String {
    RE_IMAGE
        .replace_all(text, |caps: &Captures<'_>| {
            let src = ctx.resolve(&caps[2]);
            let mut tag = format!(
                r#"<img src="{}" alt="{}""#,
                escape_attr(&src),
                escape_attr(&caps[1])
            );
            if let Some(title) = caps.get(3) {
                tag.push_str(&format!(r#" title="{}""#, escape_attr(title.as_str())));
            }
            tag.push_str("/>");
            ctx.stash(tag)
        })
        .into_owned()
}

/// `[text](href "title")` → stashed `<a>` tags around the still-unformatted
/// link text.
pub(crate) fn links(text: &str, ctx: &mut Ctx<'_>) -> String {
    RE_LINK
        .replace_all(text, |caps: &Captures<'_>| {
            let href = ctx.resolve(&caps[2]);
            let mut open = format!(r#"<a href="{}""#, escape_attr(&href));
            if let Some(title) = caps.get(3) {
                open.push_str(&format!(r#" title="{}""#, escape_attr(title.as_str())));
            }
            open.push('>');
            let open = ctx.stash(open);
            let close = ctx.stash("</a>".to_string());
            format!("{open}{}{close}", &caps[1])
        })
        .into_owned()
}

/// Bold, then italic, then strikethrough.
pub(crate) fn emphasis(text: &str) -> String {
    let s = wrap_delimited(text, "**", "strong");
    let s = wrap_delimited(&s, "__", "strong");
    let s = wrap_delimited(&s, "*", "em");
    let s = wrap_delimited(&s, "_", "em");
    wrap_delimited(&s, "~~", "del")
}

/// Replace `delim content delim` with `<tag>content</tag>`, left to right,
/// shortest match first.
fn wrap_delimited(text: &str, delim: &str, tag: &str) -> String {
    let single = delim.len() == 1;
    let underscore = delim.starts_with('_');
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    // A failed scan that reached this offset fails for every later opener
    // before it too.
    let mut no_closer_before = 0;

    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with(delim) {
            let prev = text[..i].chars().next_back();
            let opens = !(underscore && prev.is_some_and(char::is_alphanumeric))
                && i + delim.len() >= no_closer_before;
            if opens {
                match find_closing(text, i + delim.len(), delim, single, underscore) {
                    Ok(end) => {
                        out.push_str(&format!("<{tag}>{}</{tag}>", &text[i + delim.len()..end]));
                        i = end + delim.len();
                        continue;
                    }
                    Err(scanned) => no_closer_before = no_closer_before.max(scanned),
                }
            }
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    out
}

/// Byte offset of the delimiter closing content that starts at `start`.
///
/// On failure, returns the offset where the scan stopped.
fn find_closing(
    text: &str,
    start: usize,
    delim: &str,
    single: bool,
    underscore: bool,
) -> Result<usize, usize> {
    let Some(first) = text[start..].chars().next() else {
        return Err(start);
    };
    if first.is_whitespace() {
        return Err(start);
    }
    let mut j = start + first.len_utf8();
    while j < text.len() {
        let rest = &text[j..];
        // Emphasis never spans a paragraph break.
        if rest
            .strip_prefix('\n')
            .is_some_and(|next| next.split('\n').next().is_some_and(|l| l.trim().is_empty()))
        {
            return Err(j);
        }
        if rest.starts_with(delim) {
            if !single {
                // A longer run closes with its last characters: `***` ends
                // `**bold *italic***` after the inner `*`.
                let run = rest.bytes().take_while(|&b| b == delim.as_bytes()[0]).count();
                let end = j + run - delim.len();
                if run > delim.len() && end > start {
                    return Ok(end);
                }
            }
            let before = text[..j].chars().next_back();
            let after = rest[delim.len()..].chars().next();
            let doubled = single && rest[delim.len()..].starts_with(delim);
            let intraword = underscore && after.is_some_and(char::is_alphanumeric);
            if before.is_some_and(|c| !c.is_whitespace()) && !doubled && !intraword {
                return Ok(j);
            }
        }
        j += rest.chars().next().map_or(1, char::len_utf8);
    }
    Err(text.len())
}

/// Escape text content (`&`, `<`, `>`).
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value.
pub(crate) fn escape_attr(value: &str) -> String {
    escape_html(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(emphasis("**bold** and *it*"), "<strong>bold</strong> and <em>it</em>");
        assert_eq!(emphasis("__bold__ _it_"), "<strong>bold</strong> <em>it</em>");
    }

    #[test]
    fn test_cjk_emphasis() {
        assert_eq!(emphasis("这是**加粗**文字"), "这是<strong>加粗</strong>文字");
        assert_eq!(emphasis("中文*斜体*"), "中文<em>斜体</em>");
    }

    #[test]
    fn test_whitespace_bounded_content_not_emphasis() {
        assert_eq!(emphasis("a * b * c"), "a * b * c");
        assert_eq!(emphasis("~~ gone ~~"), "~~ gone ~~");
    }

    #[test]
    fn test_nested_emphasis() {
        assert_eq!(
            emphasis("**bold *and italic***"),
            "<strong>bold <em>and italic</em></strong>"
        );
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(emphasis("~~gone~~ kept"), "<del>gone</del> kept");
    }

    #[test]
    fn test_snake_case_untouched() {
        assert_eq!(emphasis("call my_func_name now"), "call my_func_name now");
    }

    #[test]
    fn test_unclosed_delimiter_left_alone() {
        assert_eq!(emphasis("2 * 3 = 6 and *open"), "2 * 3 = 6 and *open");
    }

    #[test]
    fn test_emphasis_stops_at_blank_line() {
        assert_eq!(emphasis("*a\n\nb*"), "*a\n\nb*");
        assert_eq!(emphasis("**a\n  \nb**"), "**a\n  \nb**");
        assert_eq!(emphasis("*a\nb*"), "<em>a\nb</em>");
    }

    #[test]
    fn test_many_unmatched_delimiters_stay_linear() {
        let text = "*a ".repeat(40_000);
        let started = std::time::Instant::now();
        assert_eq!(emphasis(&text), text);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_attr(r#"say "hi""#), "say &quot;hi&quot;");
    }
}
