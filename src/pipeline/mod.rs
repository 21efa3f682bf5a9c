//! Conversion stages.
//!
//! Each submodule implements one step of one direction. Keeping them apart
//! makes every step testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! HTML → Markdown:  prepass ──▶ html (+ table) ──▶ postprocess
//! Markdown → HTML:  render (blocks, inline stages, placeholder restore)
//! Files:            input ──▶ one of the above ──▶ job writes the output
//! ```
//!
//! 1. [`prepass`]: strip layout-only markup (style blocks, div/span wrappers)
//! 2. [`html`]: tokenizer-driven structural conversion with explicit state
//! 3. [`table`]: table accumulation and Markdown table rendering
//! 4. [`postprocess`]: deterministic cleanup of the emitted Markdown
//! 5. [`render`]: ordered Markdown→HTML stages, see [`blocks`] and [`inline`]
//! 6. [`input`]: read a job's file as UTF-8

pub mod blocks;
pub mod html;
pub mod inline;
pub mod input;
pub mod postprocess;
pub mod prepass;
pub mod render;
pub mod table;
