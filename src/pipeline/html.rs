//! HTML→Markdown structural converter.
//!
//! The pre-processed HTML is fed through the `html5ever` tokenizer; every
//! start tag, end tag and text run is dispatched on an [`ElementKind`] and
//! applied to a [`ParseState`] owned by the single conversion call. No DOM
//! is built: Markdown is emitted in document order as events arrive, with
//! tables buffered in a [`TableAccumulator`] until `</table>`.

use crate::config::ConversionOptions;
use crate::error::ConvertError;
use crate::pipeline::table::{Alignment, TableAccumulator};
use crate::pipeline::{postprocess, prepass};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

/// Convert an HTML document to Markdown.
///
/// Runs the pre-pass, the event-driven traversal and the Markdown cleanup.
pub fn convert(html: &str, options: &ConversionOptions) -> Result<String, ConvertError> {
    let normalised = prepass::normalise_html(html);

    let sink = EventSink {
        state: ParseState::new(options),
        pending_text: String::new(),
        error: None,
    };
    let mut tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let mut queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(&normalised));
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();

    let markdown = tokenizer.sink.finish()?;
    Ok(postprocess::clean_markdown(&markdown))
}

// ── Element dispatch ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

/// Elements the converter gives Markdown meaning to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Heading(usize),
    Paragraph,
    LineBreak,
    Strong,
    Emphasis,
    Strike,
    Code,
    Pre,
    List(ListKind),
    ListItem,
    Anchor,
    Image,
    Blockquote,
    Rule,
    Input,
    Table,
    Row,
    Cell { header: bool },
    Other,
}

impl ElementKind {
    fn from_name(name: &str) -> Self {
        match name {
            "h1" => ElementKind::Heading(1),
            "h2" => ElementKind::Heading(2),
            "h3" => ElementKind::Heading(3),
            "h4" => ElementKind::Heading(4),
            "h5" => ElementKind::Heading(5),
            "h6" => ElementKind::Heading(6),
            "p" => ElementKind::Paragraph,
            "br" => ElementKind::LineBreak,
            "strong" | "b" => ElementKind::Strong,
            "em" | "i" => ElementKind::Emphasis,
            "del" | "s" | "strike" => ElementKind::Strike,
            "code" => ElementKind::Code,
            "pre" => ElementKind::Pre,
            "ul" => ElementKind::List(ListKind::Unordered),
            "ol" => ElementKind::List(ListKind::Ordered),
            "li" => ElementKind::ListItem,
            "a" => ElementKind::Anchor,
            "img" => ElementKind::Image,
            "blockquote" => ElementKind::Blockquote,
            "hr" => ElementKind::Rule,
            "input" => ElementKind::Input,
            "table" => ElementKind::Table,
            "tr" => ElementKind::Row,
            "th" => ElementKind::Cell { header: true },
            "td" => ElementKind::Cell { header: false },
            _ => ElementKind::Other,
        }
    }
}

fn attr<'t>(tag: &'t Tag, name: &str) -> Option<&'t str> {
    tag.attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| &*a.value)
}

// ── Parse state ──────────────────────────────────────────────────────────────

/// Mutable state of one HTML→Markdown conversion.
struct ParseState<'o> {
    options: &'o ConversionOptions,
    /// Emitted Markdown fragments, in order.
    out: Vec<String>,
    lists: Vec<ListKind>,
    /// Resolved `href` of every open anchor.
    links: Vec<String>,
    in_code: bool,
    in_pre: bool,
    /// No text has been seen since `<pre>` opened.
    pre_fresh: bool,
    /// Index in `out` of the opening fence, so a `language-*` class on the
    /// inner `<code>` can become the info string.
    fence: Option<usize>,
    after_checkbox: bool,
    in_script: bool,
    table: Option<TableAccumulator>,
    /// Open `<table>` elements; only the outermost one builds rows.
    table_depth: usize,
}

impl<'o> ParseState<'o> {
    fn new(options: &'o ConversionOptions) -> Self {
        Self {
            options,
            out: Vec::new(),
            lists: Vec::new(),
            links: Vec::new(),
            in_code: false,
            in_pre: false,
            pre_fresh: false,
            fence: None,
            after_checkbox: false,
            in_script: false,
            table: None,
            table_depth: 0,
        }
    }

    /// Append to the open table cell, or to the main stream.
    fn emit(&mut self, s: &str) {
        if let Some(cell) = self.table.as_mut().and_then(|t| t.cell_mut()) {
            cell.text.push_str(s);
        } else {
            self.out.push(s.to_string());
        }
    }

    fn ends_with_whitespace(&self) -> bool {
        let last = match self.table.as_ref().and_then(|t| t.cell()) {
            Some(cell) => cell.text.chars().last(),
            None => self.out.iter().rev().find_map(|f| f.chars().last()),
        };
        last.is_none_or(char::is_whitespace)
    }

    fn handle_tag(&mut self, tag: &Tag) -> Result<(), ConvertError> {
        let name: &str = &tag.name;
        if name == "script" {
            self.in_script = tag.kind == TagKind::StartTag;
            return Ok(());
        }
        if self.options.drop_unknown_tags && !self.options.tags.allows(name) {
            trace!("dropping <{name}>");
            return Ok(());
        }
        let kind = ElementKind::from_name(name);
        match tag.kind {
            TagKind::StartTag => self.open(kind, tag),
            TagKind::EndTag => {
                self.close(kind);
                Ok(())
            }
        }
    }

    fn open(&mut self, kind: ElementKind, tag: &Tag) -> Result<(), ConvertError> {
        match kind {
            ElementKind::Heading(level) => {
                let marker = format!("\n{} ", "#".repeat(level));
                self.emit(&marker);
            }
            ElementKind::Paragraph | ElementKind::Other => {}
            ElementKind::LineBreak => self.emit("\n"),
            ElementKind::Strong => self.emit("**"),
            ElementKind::Emphasis => self.emit("*"),
            ElementKind::Strike => self.emit("~~"),
            ElementKind::Code => {
                if self.in_pre {
                    let lang = attr(tag, "class").and_then(|c| {
                        c.split_whitespace()
                            .find_map(|cls| cls.strip_prefix("language-"))
                    });
                    if let (Some(lang), Some(idx), true) = (lang, self.fence, self.pre_fresh) {
                        self.out[idx].push_str(lang);
                    }
                } else {
                    self.emit("`");
                    self.in_code = true;
                }
            }
            ElementKind::Pre => {
                self.in_pre = true;
                self.pre_fresh = true;
                self.emit("\n```");
                let in_cell = self.table.as_ref().is_some_and(|t| t.in_cell());
                self.fence = (!in_cell).then(|| self.out.len() - 1);
                self.emit("\n");
            }
            ElementKind::List(list) => self.lists.push(list),
            ElementKind::ListItem => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last() {
                    Some(ListKind::Ordered) => "1. ",
                    _ => "- ",
                };
                self.emit(&format!("\n{indent}{marker}"));
            }
            ElementKind::Anchor => {
                let href = attr(tag, "href")
                    .map(|h| self.options.resolve(h.trim()))
                    .unwrap_or_default();
                self.links.push(href);
                self.emit("[");
            }
            ElementKind::Image => {
                let src = self.options.resolve(attr(tag, "src").unwrap_or_default().trim());
                let alt = attr(tag, "alt").unwrap_or_default();
                self.emit(&format!("![{alt}]({src})"));
            }
            ElementKind::Blockquote => self.emit("\n> "),
            ElementKind::Rule => self.emit("\n\n---\n\n"),
            ElementKind::Input => {
                let is_checkbox = attr(tag, "type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox"));
                if is_checkbox {
                    let mark = if attr(tag, "checked").is_some() { "[x] " } else { "[ ] " };
                    self.emit(mark);
                    self.after_checkbox = true;
                }
            }
            ElementKind::Table => {
                // Nested tables are flattened into the enclosing cell.
                self.table_depth += 1;
                if self.table.is_none() {
                    self.table = Some(TableAccumulator::default());
                }
            }
            ElementKind::Row => {
                if let Some(t) = self.outer_table() {
                    t.start_row();
                }
            }
            ElementKind::Cell { header } => {
                if let Some(t) = self.outer_table() {
                    let align = attr(tag, "align")
                        .and_then(Alignment::from_attr)
                        .or_else(|| attr(tag, "style").and_then(Alignment::from_style));
                    t.start_cell(header, align)?;
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, kind: ElementKind) {
        match kind {
            ElementKind::Heading(_) | ElementKind::Paragraph => self.emit("\n\n"),
            ElementKind::Strong => self.emit("**"),
            ElementKind::Emphasis => self.emit("*"),
            ElementKind::Strike => self.emit("~~"),
            ElementKind::Code => {
                if !self.in_pre && self.in_code {
                    self.emit("`");
                    self.in_code = false;
                }
            }
            ElementKind::Pre => {
                if self.in_pre {
                    self.emit("\n```\n");
                    self.in_pre = false;
                    self.fence = None;
                }
            }
            ElementKind::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.emit("\n");
                }
            }
            ElementKind::Anchor => {
                let href = self.links.pop().unwrap_or_default();
                if href.is_empty() {
                    self.emit("]");
                } else {
                    self.emit(&format!("]({href})"));
                }
            }
            ElementKind::Table => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 {
                    self.flush_table();
                }
            }
            ElementKind::Row => {
                if let Some(t) = self.outer_table() {
                    t.finish_row();
                }
            }
            ElementKind::Cell { .. } => {
                if self.table_depth > 1 {
                    self.emit(" ");
                } else if let Some(t) = self.table.as_mut() {
                    t.finish_cell();
                }
            }
            _ => {}
        }
    }

    /// The table accumulator, unless the tag belongs to a nested table.
    fn outer_table(&mut self) -> Option<&mut TableAccumulator> {
        if self.table_depth > 1 {
            return None;
        }
        self.table.as_mut()
    }

    fn flush_table(&mut self) {
        if let Some(md) = self.table.take().and_then(TableAccumulator::render) {
            self.emit(&format!("\n\n{md}\n\n"));
        }
    }

    fn text(&mut self, data: &str) {
        if self.in_pre {
            let data = if self.pre_fresh {
                data.strip_prefix("\r\n")
                    .or_else(|| data.strip_prefix('\n'))
                    .unwrap_or(data)
            } else {
                data
            };
            self.pre_fresh = false;
            if !data.is_empty() {
                self.emit(data);
            }
            return;
        }
        if self.in_code {
            self.emit(data);
            return;
        }
        if self.in_script {
            return;
        }

        let collapsed = collapse_whitespace(data);
        let skip_leading = self.after_checkbox || self.ends_with_whitespace();
        if collapsed.trim().is_empty() {
            if !collapsed.is_empty() && !skip_leading {
                self.emit(&collapsed);
            }
            return;
        }
        self.after_checkbox = false;
        let chunk = if skip_leading {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        self.emit(chunk);
    }

    fn finish(mut self) -> String {
        if self.table.is_some() {
            self.table_depth = 0;
            self.flush_table();
        }
        if self.in_pre {
            self.emit("\n```\n");
        }
        self.out.concat()
    }
}

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs to one space; a run holding a blank line stays a
/// paragraph break.
fn collapse_whitespace(data: &str) -> String {
    RE_WHITESPACE_RUN
        .replace_all(data, |caps: &Captures<'_>| {
            if caps[0].matches('\n').count() >= 2 {
                "\n\n"
            } else {
                " "
            }
        })
        .into_owned()
}

// ── Tokenizer sink ───────────────────────────────────────────────────────────

/// Adapts tokenizer events onto [`ParseState`].
///
/// Adjacent character tokens are coalesced so the text handler sees whole
/// runs. The first structural error stops further handling; it is reported
/// from [`EventSink::finish`].
struct EventSink<'o> {
    state: ParseState<'o>,
    pending_text: String,
    error: Option<ConvertError>,
}

impl EventSink<'_> {
    fn flush_text(&mut self) {
        if !self.pending_text.is_empty() {
            let text = std::mem::take(&mut self.pending_text);
            self.state.text(&text);
        }
    }

    fn finish(mut self) -> Result<String, ConvertError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.flush_text();
        Ok(self.state.finish())
    }
}

impl TokenSink for EventSink<'_> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if self.error.is_some() {
            return TokenSinkResult::Continue;
        }
        let step = match token {
            Token::CharacterTokens(text) => {
                self.pending_text.push_str(&text);
                Ok(())
            }
            Token::TagToken(tag) => {
                self.flush_text();
                let opens_script = tag.kind == TagKind::StartTag && &*tag.name == "script";
                if let Err(e) = self.state.handle_tag(&tag) {
                    self.error = Some(e);
                } else if opens_script {
                    return TokenSinkResult::RawData(RawKind::ScriptData);
                }
                Ok(())
            }
            Token::EOFToken => {
                self.flush_text();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = step {
            self.error = Some(e);
        }
        TokenSinkResult::Continue
    }
}
