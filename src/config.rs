//! Configuration types for conversions and batches.
//!
//! Per-document behaviour lives in [`ConversionOptions`]; batch behaviour
//! (direction, worker count, output placement, progress) lives in
//! [`BatchConfig`]. Both are plain values passed per call, never globals, so
//! one process can run differently configured batches side by side.

use crate::error::{JobError, MdBridgeError};
use crate::policy::TagPolicy;
use crate::progress::BatchProgressCallback;
use crate::resolve;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Options shared by both conversion directions.
///
/// # Example
/// ```rust
/// use mdbridge::ConversionOptions;
///
/// let options = ConversionOptions::builder()
///     .base_url("https://example.com/docs/")
///     .rewrite_paths(true)
///     .build();
/// assert_eq!(options.resolve("a.png"), "https://example.com/docs/a.png");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Base URL relative references are joined onto. Takes precedence over
    /// `base_dir`.
    pub base_url: Option<String>,

    /// Base directory relative references are joined onto (as `file://` URIs).
    pub base_dir: Option<PathBuf>,

    /// Rewrite link and image references at all. Default: false.
    pub rewrite_paths: bool,

    /// Skip markup handling for tags outside the allow-lists. Default: false.
    pub drop_unknown_tags: bool,

    /// Inline and block allow-lists consulted when `drop_unknown_tags` is set.
    #[serde(default)]
    pub tags: TagPolicy,
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Resolve a link or image reference under these options.
    pub fn resolve(&self, reference: &str) -> String {
        resolve::resolve(
            reference,
            self.base_url.as_deref(),
            self.base_dir.as_deref(),
            self.rewrite_paths,
        )
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = Some(url.into());
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.base_dir = Some(dir.into());
        self
    }

    pub fn rewrite_paths(mut self, v: bool) -> Self {
        self.options.rewrite_paths = v;
        self
    }

    pub fn drop_unknown_tags(mut self, v: bool) -> Self {
        self.options.drop_unknown_tags = v;
        self
    }

    pub fn tags(mut self, policy: TagPolicy) -> Self {
        self.options.tags = policy;
        self
    }

    pub fn build(self) -> ConversionOptions {
        self.options
    }
}

// ── Formats ──────────────────────────────────────────────────────────────

/// The markup a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Html,
    Markdown,
}

impl DocumentFormat {
    /// File extension written for this format (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Html => "html",
            DocumentFormat::Markdown => "md",
        }
    }

    /// Infer the format of an existing file from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(DocumentFormat::Html),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            _ => None,
        }
    }

    /// The format a document of this format is converted into.
    pub fn opposite(self) -> Self {
        match self {
            DocumentFormat::Html => DocumentFormat::Markdown,
            DocumentFormat::Markdown => DocumentFormat::Html,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Direction policy for a batch: infer from the extension, or force one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// `.html` → Markdown, `.md` → HTML. (default)
    #[default]
    Auto,
    /// Always produce Markdown.
    #[serde(rename = "md")]
    Markdown,
    /// Always produce HTML.
    Html,
}

impl TargetFormat {
    /// Decide the output format for `path`.
    pub fn resolve_for(self, path: &Path) -> Result<DocumentFormat, JobError> {
        match self {
            TargetFormat::Markdown => Ok(DocumentFormat::Markdown),
            TargetFormat::Html => Ok(DocumentFormat::Html),
            TargetFormat::Auto => DocumentFormat::from_path(path)
                .map(DocumentFormat::opposite)
                .ok_or_else(|| JobError::UndetectableFormat {
                    extension: path
                        .extension()
                        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                        .unwrap_or_default(),
                }),
        }
    }
}

impl FromStr for TargetFormat {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(TargetFormat::Auto),
            "md" | "markdown" => Ok(TargetFormat::Markdown),
            "html" | "htm" => Ok(TargetFormat::Html),
            other => Err(JobError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Where a job writes its output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputPolicy {
    /// Next to the input, same stem, swapped extension. (default)
    #[default]
    SameDirectory,
    /// Under `output_dir`, keeping the path relative to `base_dir` when one is
    /// given (and the input lives below it), else just the file name.
    Mapped {
        output_dir: PathBuf,
        base_dir: Option<PathBuf>,
    },
}

// ── Batch configuration ──────────────────────────────────────────────────

/// Configuration for [`crate::batch::batch_convert`].
///
/// # Example
/// ```rust
/// use mdbridge::{BatchConfig, TargetFormat};
///
/// let config = BatchConfig::builder()
///     .target(TargetFormat::Markdown)
///     .workers(4)
///     .output_dir("out")
///     .build()
///     .unwrap();
/// assert_eq!(config.workers, 4);
/// ```
#[derive(Clone, Default)]
pub struct BatchConfig {
    /// Direction policy. Default: [`TargetFormat::Auto`].
    pub target: TargetFormat,

    /// Concurrent jobs. `<= 1` runs strictly sequentially in submission
    /// order. Default: 1.
    pub workers: usize,

    /// Relocate outputs under this directory. Default: next to the input.
    pub output_dir: Option<PathBuf>,

    /// Shared base directory: anchors output relocation and replaces the
    /// per-file directory as the resolver's `base_dir`.
    pub base_dir: Option<PathBuf>,

    /// Options forwarded to every conversion.
    pub options: ConversionOptions,

    /// Tag allow-list file, loaded once per batch. Failures fall back to the
    /// defaults.
    pub allowlist: Option<PathBuf>,

    /// Receives per-file events.
    pub progress_callback: Option<Arc<dyn BatchProgressCallback>>,
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("target", &self.target)
            .field("workers", &self.workers)
            .field("output_dir", &self.output_dir)
            .field("base_dir", &self.base_dir)
            .field("options", &self.options)
            .field("allowlist", &self.allowlist)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self {
                workers: 1,
                ..Self::default()
            },
        }
    }

    /// The output policy every job of this batch uses.
    pub fn output_policy(&self) -> OutputPolicy {
        match &self.output_dir {
            Some(dir) => OutputPolicy::Mapped {
                output_dir: dir.clone(),
                base_dir: self.base_dir.clone(),
            },
            None => OutputPolicy::SameDirectory,
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn target(mut self, target: TargetFormat) -> Self {
        self.config.target = target;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = Some(dir.into());
        self
    }

    pub fn options(mut self, options: ConversionOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn allowlist(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.allowlist = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn BatchProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, MdBridgeError> {
        let c = &self.config;
        if c.workers > MAX_WORKERS {
            return Err(MdBridgeError::InvalidConfig(format!(
                "workers must be ≤ {MAX_WORKERS}, got {}",
                c.workers
            )));
        }
        if let Some(ref out) = c.output_dir {
            if out.as_os_str().is_empty() {
                return Err(MdBridgeError::InvalidConfig(
                    "output directory must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

/// Upper bound on concurrent jobs.
pub const MAX_WORKERS: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_target_from_extension() {
        assert_eq!(
            TargetFormat::Auto.resolve_for(Path::new("a/page.HTML")).unwrap(),
            DocumentFormat::Markdown
        );
        assert_eq!(
            TargetFormat::Auto.resolve_for(Path::new("notes.md")).unwrap(),
            DocumentFormat::Html
        );
    }

    #[test]
    fn auto_target_unknown_extension() {
        let err = TargetFormat::Auto
            .resolve_for(Path::new("notes.txt"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot auto-detect target for: .txt");
    }

    #[test]
    fn forced_target_ignores_extension() {
        assert_eq!(
            TargetFormat::Html.resolve_for(Path::new("x.txt")).unwrap(),
            DocumentFormat::Html
        );
    }

    #[test]
    fn target_from_str() {
        assert_eq!("MD".parse::<TargetFormat>().unwrap(), TargetFormat::Markdown);
        assert_eq!("auto".parse::<TargetFormat>().unwrap(), TargetFormat::Auto);
        let err = "docx".parse::<TargetFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported target format: docx");
    }

    #[test]
    fn batch_builder_defaults_to_sequential() {
        let c = BatchConfig::builder().build().unwrap();
        assert_eq!(c.workers, 1);
        assert_eq!(c.output_policy(), OutputPolicy::SameDirectory);
    }

    #[test]
    fn batch_builder_rejects_huge_pool() {
        assert!(BatchConfig::builder().workers(10_000).build().is_err());
    }

    #[test]
    fn mapped_output_policy() {
        let c = BatchConfig::builder()
            .output_dir("/out")
            .base_dir("/in")
            .build()
            .unwrap();
        assert_eq!(
            c.output_policy(),
            OutputPolicy::Mapped {
                output_dir: PathBuf::from("/out"),
                base_dir: Some(PathBuf::from("/in")),
            }
        );
    }

    #[test]
    fn options_serde_round_trip() {
        let o = ConversionOptions::builder()
            .base_url("https://example.com")
            .rewrite_paths(true)
            .build();
        let json = serde_json::to_string(&o).unwrap();
        let back: ConversionOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(o, back);
    }
}
