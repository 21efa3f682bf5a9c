//! Markdown→HTML renderer.
//!
//! An ordered list of substitution stages, each `fn(&str, &mut Ctx) -> String`.
//! Stage order is part of the contract: code is recognised before anything
//! that could rewrite its contents, block structure before inline markup, and
//! paragraphs last. Output that later stages must not re-read (escaped code,
//! math, tags carrying URLs) is moved into a placeholder table and restored
//! once every stage has run.

use crate::config::ConversionOptions;
use crate::error::ConvertError;
use crate::pipeline::{blocks, inline};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").unwrap());

/// Per-call renderer state: the options and the placeholder table.
pub(crate) struct Ctx<'o> {
    options: &'o ConversionOptions,
    stash: Vec<String>,
}

impl<'o> Ctx<'o> {
    pub(crate) fn new(options: &'o ConversionOptions) -> Self {
        Self {
            options,
            stash: Vec::new(),
        }
    }

    /// Move finished HTML out of reach of later stages; returns its token.
    pub(crate) fn stash(&mut self, html: String) -> String {
        let token = format!("{PLACEHOLDER_OPEN}{}{PLACEHOLDER_CLOSE}", self.stash.len());
        self.stash.push(html);
        token
    }

    /// The stashed HTML a block begins with, if it begins with a placeholder.
    pub(crate) fn stashed_prefix(&self, block: &str) -> Option<&str> {
        let caps = RE_PLACEHOLDER.captures(block)?;
        if caps.get(0)?.start() != 0 {
            return None;
        }
        let idx: usize = caps[1].parse().ok()?;
        self.stash.get(idx).map(String::as_str)
    }

    pub(crate) fn resolve(&self, reference: &str) -> String {
        self.options.resolve(reference)
    }
}

type Stage = fn(&str, &mut Ctx<'_>) -> String;

/// Rendering stages, in order.
const STAGES: [(&str, Stage); 12] = [
    ("fenced_code", blocks::fenced_code),
    ("inline_code", blocks::inline_code),
    ("math", blocks::math),
    ("headings", blocks::headings),
    ("rules", blocks::horizontal_rules),
    ("blockquotes", blocks::blockquotes),
    ("tables", blocks::tables),
    ("lists", blocks::lists),
    ("images", inline::images),
    ("links", inline::links),
    ("emphasis", emphasis_stage),
    ("paragraphs", blocks::paragraphs),
];

fn emphasis_stage(text: &str, _ctx: &mut Ctx<'_>) -> String {
    inline::emphasis(text)
}

/// Render Markdown to an HTML fragment.
pub fn render(markdown: &str, options: &ConversionOptions) -> Result<String, ConvertError> {
    let mut ctx = Ctx::new(options);
    let mut html = protect_sentinels(&markdown.replace("\r\n", "\n"), &mut ctx);
    for (name, stage) in STAGES {
        html = stage(&html, &mut ctx);
        debug!(stage = name, len = html.len(), "render stage done");
    }
    restore(&html, &ctx)
}

/// Input that already contains the placeholder delimiters gets them stashed
/// as character references, so no user text can be mistaken for a token.
fn protect_sentinels(text: &str, ctx: &mut Ctx<'_>) -> String {
    if !text.contains([PLACEHOLDER_OPEN, PLACEHOLDER_CLOSE]) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == PLACEHOLDER_OPEN || c == PLACEHOLDER_CLOSE {
            out.push_str(&ctx.stash(format!("&#x{:X};", c as u32)));
        } else {
            out.push(c);
        }
    }
    out
}

/// Replace placeholder tokens with their stashed HTML.
///
/// Stashed HTML may itself hold tokens, so replacement repeats until none
/// are left; the number of passes is bounded by the table size.
fn restore(html: &str, ctx: &Ctx<'_>) -> Result<String, ConvertError> {
    let mut current = html.to_string();
    for _ in 0..=ctx.stash.len() {
        if !RE_PLACEHOLDER.is_match(&current) {
            return Ok(current);
        }
        let mut missing = None;
        current = RE_PLACEHOLDER
            .replace_all(&current, |caps: &Captures<'_>| {
                let stashed = caps[1].parse::<usize>().ok().and_then(|i| ctx.stash.get(i));
                match stashed {
                    Some(s) => s.clone(),
                    None => {
                        missing.get_or_insert_with(|| caps[1].to_string());
                        String::new()
                    }
                }
            })
            .into_owned();
        if let Some(idx) = missing {
            return Err(ConvertError::Render(format!("placeholder {idx} has no stashed content")));
        }
    }
    Err(ConvertError::Render("placeholders did not resolve".into()))
}
