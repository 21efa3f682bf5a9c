//! # mdbridge
//!
//! Convert documents between HTML and Markdown, one at a time or in
//! concurrent batches.
//!
//! ## Why this crate?
//!
//! Moving notes between a web page, a wiki and a Markdown editor means
//! converting in both directions, and usually for whole folders at once. The
//! converters here are small and predictable rather than complete: they
//! cover the structure documents actually carry (headings, emphasis, links,
//! images, code, lists, task lists, tables with alignment, quotes, math) and
//! never fail: a document that cannot be converted comes back as a sensible
//! fallback instead of an error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML ─▶ pre-pass ─▶ tokenizer events + parse state ─▶ cleanup ─▶ Markdown
//! Markdown ─▶ 12 ordered stages (placeholder-protected) ─▶ restore ─▶ HTML
//!
//! files ─▶ batch (auto direction, N workers, pause/cancel) ─▶ results + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mdbridge::{html_to_markdown, markdown_to_html, ConversionOptions};
//!
//! let options = ConversionOptions::default();
//! let md = html_to_markdown(r#"<p><a href="https://example.com">Example</a></p>"#, &options);
//! assert_eq!(md, "[Example](https://example.com)");
//!
//! let html = markdown_to_html("- [x] done", &options);
//! assert!(html.contains(r#"<input type="checkbox" checked disabled/>"#));
//! ```
//!
//! ## Batches
//!
//! ```rust,no_run
//! use mdbridge::{batch_convert_blocking, collect_files, BatchConfig, BatchControl};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let files = collect_files(Path::new("notes"), &["html", "htm", "md", "markdown"], true)?;
//! let config = BatchConfig::builder().workers(4).output_dir("out").base_dir("notes").build()?;
//! let output = batch_convert_blocking(files, &config, Arc::new(BatchControl::new()))?;
//! eprintln!("{} converted, {} failed", output.stats.converted, output.stats.failed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdbridge` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! mdbridge = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod resolve;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    batch_convert, batch_convert_blocking, batch_stream, collect_files, BatchControl, ResultStream,
};
pub use config::{
    BatchConfig, BatchConfigBuilder, ConversionOptions, ConversionOptionsBuilder, DocumentFormat,
    OutputPolicy, TargetFormat,
};
pub use convert::{
    html_to_markdown, markdown_to_html, try_html_to_markdown, try_markdown_to_html, Document,
};
pub use error::{ConvertError, JobError, MdBridgeError, PolicyError};
pub use job::{convert_file, ConversionJob};
pub use output::{BatchOutput, BatchStats, ConversionResult};
pub use policy::{is_allowed, load_allowlist, load_allowlist_file, TagPolicy};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use resolve::resolve;
