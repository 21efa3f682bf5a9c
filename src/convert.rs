//! Single-document conversion entry points.
//!
//! ## Total vs. fallible
//!
//! Each direction comes in two flavours. The `try_*` functions return the
//! [`ConvertError`] so callers can react to it. The plain functions never
//! fail: on error (or a panic inside a converter) they log a warning and
//! return a best-effort string, which is what a batch job or an editor
//! preview wants.
//!
//! | Direction | Fallback on failure |
//! |-----------|---------------------|
//! | HTML → Markdown | the input HTML, unchanged |
//! | Markdown → HTML | `<p>` + escaped Markdown + `</p>` |

use crate::config::{ConversionOptions, DocumentFormat};
use crate::error::ConvertError;
use crate::pipeline::{html, inline, render};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Convert HTML to Markdown, falling back to the input on failure.
pub fn html_to_markdown(text: &str, options: &ConversionOptions) -> String {
    match try_html_to_markdown(text, options) {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!("HTML→Markdown conversion failed, returning input unchanged: {e}");
            text.to_string()
        }
    }
}

/// Convert HTML to Markdown.
///
/// # Errors
/// [`ConvertError::Parse`] for structure the converter cannot map (a table
/// cell outside any row), [`ConvertError::Panicked`] if the converter
/// panicked.
pub fn try_html_to_markdown(text: &str, options: &ConversionOptions) -> Result<String, ConvertError> {
    debug!("Converting {} bytes of HTML", text.len());
    guarded(|| html::convert(text, options))
}

/// Render Markdown to HTML, falling back to an escaped paragraph on failure.
pub fn markdown_to_html(text: &str, options: &ConversionOptions) -> String {
    match try_markdown_to_html(text, options) {
        Ok(html) => html,
        Err(e) => {
            warn!("Markdown→HTML rendering failed, returning escaped text: {e}");
            format!("<p>{}</p>", inline::escape_html(text))
        }
    }
}

/// Render Markdown to HTML.
///
/// # Errors
/// [`ConvertError::Render`] if a protected fragment could not be restored,
/// [`ConvertError::Panicked`] if a stage panicked.
pub fn try_markdown_to_html(text: &str, options: &ConversionOptions) -> Result<String, ConvertError> {
    debug!("Rendering {} bytes of Markdown", text.len());
    guarded(|| render::render(text, options))
}

/// Run a converter, turning a panic into [`ConvertError::Panicked`].
fn guarded<F>(f: F) -> Result<String, ConvertError>
where
    F: FnOnce() -> Result<String, ConvertError>,
{
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ConvertError::Panicked(msg))
    })
}

/// A document in memory, tagged with its format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub format: DocumentFormat,
}

impl Document {
    pub fn new(text: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self::new(text, DocumentFormat::Html)
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::new(text, DocumentFormat::Markdown)
    }

    /// Convert to the opposite format. Never fails; see the module docs
    /// for the fallbacks.
    pub fn convert(&self, options: &ConversionOptions) -> String {
        match self.format {
            DocumentFormat::Html => html_to_markdown(&self.text, options),
            DocumentFormat::Markdown => markdown_to_html(&self.text, options),
        }
    }

    /// Like [`Document::convert`], but returns the converted document.
    pub fn try_convert(&self, options: &ConversionOptions) -> Result<Document, ConvertError> {
        let text = match self.format {
            DocumentFormat::Html => try_html_to_markdown(&self.text, options)?,
            DocumentFormat::Markdown => try_markdown_to_html(&self.text, options)?,
        };
        Ok(Document::new(text, self.format.opposite()))
    }
}
