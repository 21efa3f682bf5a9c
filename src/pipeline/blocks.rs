//! Block stages of the Markdown→HTML renderer.
//!
//! Every block stage surrounds its output with blank lines so that the
//! paragraph stage sees each rendered block on its own.

use crate::pipeline::inline::{escape_attr, escape_html, render_inline};
use crate::pipeline::render::Ctx;
use crate::pipeline::table::Alignment;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

fn isolate(html: &str) -> String {
    format!("\n\n{html}\n\n")
}

// ── Stage 1: fenced code ─────────────────────────────────────────────────────

/// ```` ```lang ```` fences → escaped, stashed `<pre><code>`.
///
/// A fence that is never closed runs to the end of the input.
pub(crate) fn fenced_code(text: &str, ctx: &mut Ctx<'_>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lines = text.split_inclusive('\n');

    while let Some(line) = lines.next() {
        // A backtick in the info string makes the line inline code, not a fence.
        let Some(info) = line
            .trim_start()
            .strip_prefix("```")
            .filter(|info| !info.contains('`'))
        else {
            out.push_str(line);
            continue;
        };
        let lang = info.split_whitespace().next().unwrap_or("text");
        let lang = if lang.is_empty() { "text" } else { lang };

        let mut code = String::new();
        for body in lines.by_ref() {
            if body.trim().starts_with("```") && body.trim().chars().all(|c| c == '`') {
                break;
            }
            code.push_str(body);
        }
        let html = format!(
            r#"<pre><code class="language-{}">{}</code></pre>"#,
            escape_attr(lang),
            escape_html(&code)
        );
        let token = ctx.stash(html);
        out.push_str(&isolate(&token));
    }
    out
}

// ── Stage 2: inline code ─────────────────────────────────────────────────────

static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());

pub(crate) fn inline_code(text: &str, ctx: &mut Ctx<'_>) -> String {
    RE_INLINE_CODE
        .replace_all(text, |caps: &Captures<'_>| {
            ctx.stash(format!("<code>{}</code>", escape_html(&caps[1])))
        })
        .into_owned()
}

// ── Stage 3: math ────────────────────────────────────────────────────────────

static RE_MATH_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$\$(.+?)\$\$").unwrap());
static RE_MATH_INLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([^\s$](?:[^$\n]*[^\s$])?)\$").unwrap());

/// `$$…$$` → `<div class="math">`, `$…$` → `<span class="math">`.
///
/// The TeX source is escaped and left for a client-side renderer.
pub(crate) fn math(text: &str, ctx: &mut Ctx<'_>) -> String {
    let s = RE_MATH_BLOCK.replace_all(text, |caps: &Captures<'_>| {
        let html = format!(r#"<div class="math">{}</div>"#, escape_html(caps[1].trim()));
        isolate(&ctx.stash(html))
    });
    RE_MATH_INLINE
        .replace_all(&s, |caps: &Captures<'_>| {
            ctx.stash(format!(r#"<span class="math">{}</span>"#, escape_html(&caps[1])))
        })
        .into_owned()
}

// ── Stage 4: headings ────────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").unwrap());

pub(crate) fn headings(text: &str, ctx: &mut Ctx<'_>) -> String {
    RE_HEADING
        .replace_all(text, |caps: &Captures<'_>| {
            let level = caps[1].len();
            let body = render_inline(&caps[2], ctx);
            isolate(&format!("<h{level}>{body}</h{level}>"))
        })
        .into_owned()
}

// ── Stage 5: horizontal rules ────────────────────────────────────────────────

static RE_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap()
});

pub(crate) fn horizontal_rules(text: &str, _ctx: &mut Ctx<'_>) -> String {
    RE_RULE.replace_all(text, isolate("<hr/>")).into_owned()
}

// ── Stage 6: blockquotes ─────────────────────────────────────────────────────

/// Consecutive `>` lines become one `<blockquote>`.
///
/// A bare `>` line separates paragraphs inside the quote; those are wrapped
/// in `<p>` here so the paragraph stage never splits the quote itself.
pub(crate) fn blockquotes(text: &str, _ctx: &mut Ctx<'_>) -> String {
    let mut out = Vec::new();
    let mut quote: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if let Some(rest) = line.trim_start().strip_prefix('>') {
            quote.push(rest.strip_prefix(' ').unwrap_or(rest));
            continue;
        }
        if !quote.is_empty() {
            out.push(isolate(&quote_html(&quote)));
            quote.clear();
        }
        out.push(line.to_string());
    }
    if !quote.is_empty() {
        out.push(isolate(&quote_html(&quote)));
    }
    out.join("\n")
}

fn quote_html(lines: &[&str]) -> String {
    let paragraphs: Vec<String> = lines
        .split(|line| line.trim().is_empty())
        .filter(|group| !group.is_empty())
        .map(|group| group.join("\n"))
        .collect();
    match paragraphs.as_slice() {
        [single] => format!("<blockquote>{single}</blockquote>"),
        many => {
            let body: String = many.iter().map(|p| format!("<p>{p}</p>")).collect();
            format!("<blockquote>{body}</blockquote>")
        }
    }
}

// ── Stage 7: tables ──────────────────────────────────────────────────────────

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 1 && t.starts_with('|') && t.ends_with('|')
}

fn split_cells(line: &str) -> Vec<&str> {
    let t = line.trim();
    let inner = t.strip_prefix('|').unwrap_or(t);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

/// Alignments from a divider row, or `None` if the line is not a divider.
fn parse_divider(line: &str) -> Option<Vec<Option<Alignment>>> {
    if !is_table_row(line) {
        return None;
    }
    split_cells(line)
        .into_iter()
        .map(|cell| {
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                return None;
            }
            Some(match (cell.starts_with(':'), cell.ends_with(':')) {
                (true, true) => Some(Alignment::Center),
                (true, false) => Some(Alignment::Left),
                (false, true) => Some(Alignment::Right),
                (false, false) => None,
            })
        })
        .collect()
}

fn align_attr(align: Option<Alignment>) -> &'static str {
    match align {
        Some(Alignment::Left) => r#" align="left""#,
        Some(Alignment::Right) => r#" align="right""#,
        Some(Alignment::Center) => r#" align="center""#,
        None => "",
    }
}

fn table_row(cells: &[&str], aligns: &[Option<Alignment>], tag: &str) -> String {
    let mut row = String::from("<tr>");
    for (i, align) in aligns.iter().enumerate() {
        let cell = cells.get(i).copied().unwrap_or("");
        row.push_str(&format!("<{tag}{}>{cell}</{tag}>", align_attr(*align)));
    }
    row.push_str("</tr>");
    row
}

/// Header row + divider row + body rows → `<table>`.
///
/// Body rows are padded or cut to the header's column count.
pub(crate) fn tables(text: &str, _ctx: &mut Ctx<'_>) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let header = lines[i];
        let divider = lines.get(i + 1).and_then(|l| parse_divider(l));
        let (true, Some(aligns)) = (is_table_row(header), divider) else {
            out.push(header.to_string());
            i += 1;
            continue;
        };

        let head_cells = split_cells(header);
        let aligns: Vec<Option<Alignment>> = (0..head_cells.len())
            .map(|c| aligns.get(c).copied().flatten())
            .collect();

        let mut html = String::from("<table><thead>");
        html.push_str(&table_row(&head_cells, &aligns, "th"));
        html.push_str("</thead>");

        i += 2;
        let mut body = Vec::new();
        while i < lines.len() && is_table_row(lines[i]) {
            body.push(table_row(&split_cells(lines[i]), &aligns, "td"));
            i += 1;
        }
        if !body.is_empty() {
            html.push_str("<tbody>");
            html.push_str(&body.concat());
            html.push_str("</tbody>");
        }
        html.push_str("</table>");
        out.push(isolate(&html));
    }
    out.join("\n")
}

// ── Stage 8: lists ───────────────────────────────────────────────────────────

static RE_LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)([-*+]|(\d{1,9})[.)])[ \t]+(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

struct ListFrame {
    indent: usize,
    kind: ListKind,
    item_open: bool,
}

/// Builds nested `<ul>`/`<ol>` markup from consecutive item lines.
#[derive(Default)]
struct ListBuilder {
    html: String,
    stack: Vec<ListFrame>,
}

impl ListBuilder {
    fn item(&mut self, indent: usize, kind: ListKind, start: Option<&str>, content: &str) {
        while self.stack.last().is_some_and(|f| f.indent > indent) {
            self.close_frame();
        }
        let same_level = self
            .stack
            .last()
            .filter(|f| f.indent == indent)
            .map(|f| (f.kind, f.item_open));
        match same_level {
            Some((open_kind, item_open)) if open_kind == kind => {
                if item_open {
                    self.html.push_str("</li>");
                }
            }
            Some(_) => {
                self.close_frame();
                self.open_frame(indent, kind, start);
            }
            None => self.open_frame(indent, kind, start),
        }
        self.html.push_str("<li>");
        self.html.push_str(&task_item(content));
        if let Some(top) = self.stack.last_mut() {
            top.item_open = true;
        }
    }

    fn open_frame(&mut self, indent: usize, kind: ListKind, start: Option<&str>) {
        match (kind, start) {
            (ListKind::Ordered, Some(n)) if n.trim_start_matches('0') != "1" => {
                let n = n.parse::<u64>().unwrap_or(1);
                self.html.push_str(&format!(r#"<ol start="{n}">"#));
            }
            (ListKind::Ordered, _) => self.html.push_str("<ol>"),
            (ListKind::Unordered, _) => self.html.push_str("<ul>"),
        }
        self.stack.push(ListFrame {
            indent,
            kind,
            item_open: false,
        });
    }

    fn close_frame(&mut self) {
        if let Some(frame) = self.stack.pop() {
            if frame.item_open {
                self.html.push_str("</li>");
            }
            self.html.push_str(match frame.kind {
                ListKind::Ordered => "</ol>",
                ListKind::Unordered => "</ul>",
            });
        }
    }

    fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close_frame();
        }
        self.html
    }
}

fn task_item(content: &str) -> String {
    let checkbox = |checked: bool, rest: &str| {
        let attr = if checked { " checked" } else { "" };
        format!(r#"<input type="checkbox"{attr} disabled/> {}"#, rest.trim_start())
    };
    if let Some(rest) = content.strip_prefix("[x]").or_else(|| content.strip_prefix("[X]")) {
        checkbox(true, rest)
    } else if let Some(rest) = content.strip_prefix("[ ]") {
        checkbox(false, rest)
    } else {
        content.to_string()
    }
}

fn indent_width(prefix: &str) -> usize {
    prefix.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum()
}

/// `-`/`*`/`+` and `N.` items → nested lists. A run of consecutive item
/// lines forms one list; nesting follows indentation.
pub(crate) fn lists(text: &str, _ctx: &mut Ctx<'_>) -> String {
    let mut out = Vec::new();
    let mut builder: Option<ListBuilder> = None;

    for line in text.split('\n') {
        if let Some(caps) = RE_LIST_ITEM.captures(line) {
            let kind = if caps.get(3).is_some() {
                ListKind::Ordered
            } else {
                ListKind::Unordered
            };
            let start = caps.get(3).map(|m| m.as_str());
            builder
                .get_or_insert_with(ListBuilder::default)
                .item(indent_width(&caps[1]), kind, start, &caps[4]);
            continue;
        }
        if let Some(done) = builder.take() {
            out.push(isolate(&done.finish()));
        }
        out.push(line.to_string());
    }
    if let Some(done) = builder.take() {
        out.push(isolate(&done.finish()));
    }
    out.join("\n")
}

// ── Stage 12: paragraphs ─────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n)+").unwrap());
static RE_BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^<(?:h[1-6]|pre|blockquote|hr|ul|ol|li|table|div)\b").unwrap()
});

/// Wrap every non-block chunk between blank lines in `<p>`.
pub(crate) fn paragraphs(text: &str, ctx: &mut Ctx<'_>) -> String {
    let mut out = Vec::new();
    for block in RE_BLANK_LINES.split(text) {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        let is_block = RE_BLOCK_TAG.is_match(block)
            || ctx.stashed_prefix(block).is_some_and(|s| RE_BLOCK_TAG.is_match(s));
        if is_block {
            out.push(block.to_string());
        } else {
            out.push(format!("<p>{block}</p>"));
        }
    }
    out.join("\n")
}
