//! Tag allow-lists for the HTML→Markdown converter.
//!
//! With `drop_unknown_tags` enabled, an element whose name is in neither the
//! inline nor the block set loses its markup handling; its text is still
//! emitted. Override sets come from a JSON payload of the shape
//! `{ "inline": [...], "block": [...] }`.

use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Inline element names kept by default.
pub const DEFAULT_ALLOWED_INLINE: &[&str] = &[
    "a", "strong", "b", "em", "i", "code", "span", "img", "sup", "sub", "del",
];

/// Block element names kept by default.
pub const DEFAULT_ALLOWED_BLOCK: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "code",
    "table", "thead", "tbody", "tr", "th", "td", "hr",
];

/// A pair of lower-case tag-name sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPolicy {
    #[serde(default)]
    pub inline: BTreeSet<String>,
    #[serde(default)]
    pub block: BTreeSet<String>,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            inline: DEFAULT_ALLOWED_INLINE.iter().map(|t| t.to_string()).collect(),
            block: DEFAULT_ALLOWED_BLOCK.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl TagPolicy {
    /// Build a policy from explicit name lists. Names are lower-cased.
    pub fn new<I, B, S>(inline: I, block: B) -> Self
    where
        I: IntoIterator<Item = S>,
        B: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            inline: inline.into_iter().map(|t| t.as_ref().to_ascii_lowercase()).collect(),
            block: block.into_iter().map(|t| t.as_ref().to_ascii_lowercase()).collect(),
        }
    }

    /// Whether `tag` appears in either set (case-insensitive).
    pub fn allows(&self, tag: &str) -> bool {
        is_allowed(tag, &self.inline, &self.block)
    }

    /// Union with the default sets.
    pub fn merged_with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.inline.extend(defaults.inline);
        self.block.extend(defaults.block);
        self
    }

    /// Load a policy file, falling back to the defaults on any failure.
    pub fn from_file_or_default(path: &Path) -> Self {
        match load_allowlist_file(path) {
            Ok(policy) => {
                debug!(
                    "Loaded allow-list {}: {} inline, {} block",
                    path.display(),
                    policy.inline.len(),
                    policy.block.len()
                );
                policy
            }
            Err(e) => {
                warn!("{e}; using default allow-lists");
                Self::default()
            }
        }
    }
}

/// Case-insensitive membership test against the two allow-lists.
pub fn is_allowed(tag: &str, allow_inline: &BTreeSet<String>, allow_block: &BTreeSet<String>) -> bool {
    let t = tag.to_ascii_lowercase();
    allow_inline.contains(&t) || allow_block.contains(&t)
}

/// Parse an allow-list payload. A missing key is an empty set.
pub fn load_allowlist(payload: &str) -> Result<TagPolicy, PolicyError> {
    let raw: TagPolicy = serde_json::from_str(payload)?;
    Ok(TagPolicy::new(raw.inline, raw.block))
}

/// Read and parse an allow-list file.
pub fn load_allowlist_file(path: &Path) -> Result<TagPolicy, PolicyError> {
    let payload = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_allowlist(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_inline_and_block() {
        let p = TagPolicy::default();
        for tag in ["a", "strong", "img", "del", "p", "h6", "table", "td", "hr"] {
            assert!(p.allows(tag), "{tag} should be allowed");
        }
        assert!(!p.allows("font"));
        assert!(!p.allows("input"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let p = TagPolicy::default();
        assert!(p.allows("STRONG"));
        assert!(p.allows("Blockquote"));
    }

    #[test]
    fn payload_missing_key_is_empty() {
        let p = load_allowlist(r#"{ "inline": ["A", "mark"] }"#).unwrap();
        assert!(p.block.is_empty());
        assert!(p.allows("a"));
        assert!(p.allows("mark"));
        assert!(!p.allows("p"));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(load_allowlist("not json").is_err());
        assert!(load_allowlist(r#"{ "inline": "a" }"#).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let p = TagPolicy::from_file_or_default(Path::new("/definitely/not/here.json"));
        assert_eq!(p, TagPolicy::default());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allow.json");
        std::fs::write(&path, r#"{ "inline": ["kbd"], "block": ["section"] }"#).unwrap();
        let p = TagPolicy::from_file_or_default(&path);
        assert!(p.allows("kbd"));
        assert!(p.allows("section"));
        assert!(!p.allows("a"));
    }

    #[test]
    fn merge_keeps_overrides_and_defaults() {
        let p = TagPolicy::new(["kbd"], ["section"]).merged_with_defaults();
        assert!(p.allows("kbd"));
        assert!(p.allows("section"));
        assert!(p.allows("a"));
    }
}
