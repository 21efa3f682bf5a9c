//! Post-processing: deterministic cleanup of converter-emitted Markdown.
//!
//! The structural converter writes markers as tags arrive and never looks
//! back, so its raw output carries a few predictable artefacts: runs of
//! blank lines where block elements meet, `[]` remnants of anchors that had
//! no text, and a leading `<title>` line repeated by the first heading.
//!
//! Each rule is a pure `&str → String` pass. Code fences and inline code
//! spans are never rewritten by the rules that touch prose.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to raw converter output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM)
/// 3. Remove empty link remnants (`[](href)` and bare `[]`)
/// 4. Trim trailing whitespace per line outside code fences
/// 5. Collapse 3+ consecutive newlines down to 2
/// 6. Drop a leading title line that the first heading repeats
/// 7. Trim the document
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_empty_links(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = drop_duplicate_title(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'], "")
}

// ── Rule 3: Remove empty link remnants ───────────────────────────────────────
//
// An anchor whose only child was dropped (or that wrapped nothing) leaves
// `[](href)` or `[]`. Image syntax `![](src)` is legitimate and kept.

static RE_EMPTY_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^!\\])\[\]\([^)\s]*\)").unwrap());
static RE_EMPTY_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|[^!\\])\[\]").unwrap());

fn remove_empty_links(input: &str) -> String {
    map_prose(input, |segment| {
        let s = RE_EMPTY_LINK.replace_all(segment, "$1");
        RE_EMPTY_BRACKETS.replace_all(&s, "$1").into_owned()
    })
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    let mut in_fence = false;
    input
        .lines()
        .map(|line| {
            if is_fence(line) {
                in_fence = !in_fence;
                line.trim_end()
            } else if in_fence {
                line
            } else {
                line.trim_end()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Drop duplicated title line ───────────────────────────────────────
//
// `<title>Guide</title>` followed by `<h1>Guide</h1>` yields
// `Guide\n# Guide`; only the heading is kept.

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6} (.*)$").unwrap());

fn drop_duplicate_title(input: &str) -> String {
    let body = input.trim_start();
    let Some((first, rest)) = body.split_once('\n') else {
        return body.to_string();
    };
    let rest = rest.trim_start_matches(|c: char| c == '\n' || c == ' ' || c == '\t');
    let next = rest.lines().next().unwrap_or("");
    let repeated = RE_HEADING
        .captures(next)
        .is_some_and(|caps| caps[1].trim() == first.trim() && !first.trim().is_empty());
    if repeated {
        rest.to_string()
    } else {
        body.to_string()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Apply `f` to every stretch of text outside code fences and inline code.
fn map_prose(input: &str, f: impl Fn(&str) -> String) -> String {
    let mut in_fence = false;
    let mut out = Vec::new();
    for line in input.split('\n') {
        if is_fence(line) {
            in_fence = !in_fence;
            out.push(line.to_string());
        } else if in_fence {
            out.push(line.to_string());
        } else {
            let mapped: Vec<String> = line
                .split('`')
                .enumerate()
                .map(|(i, part)| if i % 2 == 0 { f(part) } else { part.to_string() })
                .collect();
            out.push(mapped.join("`"));
        }
    }
    out.join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
