//! Link and image reference resolution.
//!
//! Both converters send every `href`/`src` through [`resolve`]. Rewriting is
//! opt-in: unless `rewrite_paths` is set, references pass through untouched
//! so `data:` URIs, anchors and deliberately relative links survive.

use std::path::{Component, Path, PathBuf};
use url::Url;

/// Resolve `reference` against a base URL or base directory.
///
/// * `rewrite_paths == false` → unchanged.
/// * `base_url` set → URL join; references with a scheme stay as they are.
/// * `base_dir` set → filesystem join rendered as a `file://` URI.
/// * otherwise → unchanged.
///
/// Never fails: anything that cannot be resolved is returned as given.
pub fn resolve(
    reference: &str,
    base_url: Option<&str>,
    base_dir: Option<&Path>,
    rewrite_paths: bool,
) -> String {
    if !rewrite_paths || reference.is_empty() {
        return reference.to_string();
    }
    if let Some(base) = base_url.filter(|b| !b.is_empty()) {
        return join_url(base, reference).unwrap_or_else(|| reference.to_string());
    }
    if let Some(dir) = base_dir {
        return join_path(dir, reference).unwrap_or_else(|| reference.to_string());
    }
    reference.to_string()
}

fn join_url(base: &str, reference: &str) -> Option<String> {
    if has_scheme(reference) {
        return Some(reference.to_string());
    }
    let base = Url::parse(base).ok()?;
    base.join(reference).ok().map(String::from)
}

fn join_path(dir: &Path, reference: &str) -> Option<String> {
    if has_scheme(reference) || reference.starts_with('#') {
        return None;
    }
    let joined = std::path::absolute(dir.join(reference)).ok()?;
    let normalised = normalise(&joined);
    Url::from_file_path(&normalised).ok().map(String::from)
}

/// `true` for references such as `https://…`, `mailto:…`, `data:…`.
///
/// A Windows drive letter (`C:\…`) is not a scheme.
fn has_scheme(reference: &str) -> bool {
    match Url::parse(reference) {
        Ok(url) => url.scheme().len() > 1,
        Err(_) => false,
    }
}

/// Lexically fold `.` and `..` components.
fn normalise(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/docs/guide/";

    #[test]
    fn passthrough_without_rewrite() {
        assert_eq!(resolve("img/a.png", Some(BASE), None, false), "img/a.png");
        assert_eq!(
            resolve("../x.html", None, Some(Path::new("/tmp")), false),
            "../x.html"
        );
    }

    #[test]
    fn url_join_relative() {
        assert_eq!(
            resolve("img/a.png", Some(BASE), None, true),
            "https://example.com/docs/guide/img/a.png"
        );
    }

    #[test]
    fn url_join_parent_and_root() {
        assert_eq!(
            resolve("../intro.html", Some(BASE), None, true),
            "https://example.com/docs/intro.html"
        );
        assert_eq!(
            resolve("/path/page", Some("https://example.com"), None, true),
            "https://example.com/path/page"
        );
    }

    #[test]
    fn absolute_reference_unchanged() {
        assert_eq!(
            resolve("https://other.org/x", Some(BASE), None, true),
            "https://other.org/x"
        );
        assert_eq!(
            resolve("mailto:a@b.c", Some(BASE), None, true),
            "mailto:a@b.c"
        );
    }

    #[test]
    fn base_url_wins_over_base_dir() {
        let out = resolve("a.png", Some(BASE), Some(Path::new("/srv")), true);
        assert!(out.starts_with("https://"), "got: {out}");
    }

    #[cfg(unix)]
    #[test]
    fn base_dir_produces_file_uri() {
        assert_eq!(
            resolve("images/a.png", None, Some(Path::new("/srv/site")), true),
            "file:///srv/site/images/a.png"
        );
        assert_eq!(
            resolve("../shared/b.png", None, Some(Path::new("/srv/site/docs")), true),
            "file:///srv/site/shared/b.png"
        );
    }

    #[test]
    fn base_dir_leaves_schemes_and_fragments() {
        let dir = Some(Path::new("/srv/site"));
        assert_eq!(resolve("#top", None, dir, true), "#top");
        assert_eq!(
            resolve("data:image/png;base64,AAAA", None, dir, true),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn bad_base_url_is_passthrough() {
        assert_eq!(resolve("a.png", Some("not a url"), None, true), "a.png");
    }

    #[test]
    fn no_base_is_passthrough() {
        assert_eq!(resolve("a.png", None, None, true), "a.png");
    }
}
