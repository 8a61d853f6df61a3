//! Async file utilities.
//!
//! Read-only lookups used when correlating extracted references with the
//! processed-document directory tree. Nothing here writes to disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::{Error, Result};

/// Placeholder values substituted into lookup patterns.
///
/// A pattern such as `page_{page}/tables/{id}.html` is rendered by replacing
/// every `{name}` with the value registered under `name`. Values are single
/// path segments: see [`is_safe_segment`].
#[derive(Debug, Clone, Default)]
pub struct PatternVars {
    values: BTreeMap<&'static str, String>,
}

impl PatternVars {
    /// Create an empty variable set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a placeholder value.
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    /// Render a pattern.
    ///
    /// Returns `None` when the pattern references an unknown placeholder or a
    /// substituted value is not a safe path segment. Braces inside values are
    /// copied literally.
    pub fn render(&self, pattern: &str) -> Option<String> {
        let mut rendered = String::with_capacity(pattern.len());
        let mut rest = pattern;
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}')?;
            let value = self.values.get(&after[..close])?;
            if !is_safe_segment(value) {
                return None;
            }
            rendered.push_str(value);
            rest = &after[close + 1..];
        }
        rendered.push_str(rest);
        Some(rendered)
    }
}

/// Whether `value` can be joined under a base directory as one path segment.
///
/// Rejects empty values, path separators, NUL and any `..`.
pub fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && !value.contains("..")
        && !value.contains(['/', '\\', '\0'])
}

/// Find the first existing file among rendered patterns under `base_path`.
///
/// Patterns are tried in order. Patterns with unresolved placeholders are
/// skipped. Returns `None` when nothing matches, including when `base_path`
/// itself does not exist.
///
/// # Example
///
/// ```no_run
/// # use gigo_core::util::files::{find_first_match, PatternVars};
/// # use std::path::Path;
/// # async fn example() {
/// let vars = PatternVars::new().with("page", "45").with("id", "table-45-2");
/// let found = find_first_match(
///     Path::new("scratch/manual"),
///     &["page_{page}/tables/{id}.html"],
///     &vars,
/// )
/// .await;
/// # }
/// ```
pub async fn find_first_match(
    base_path: &Path,
    patterns: &[&str],
    vars: &PatternVars,
) -> Option<PathBuf> {
    for pattern in patterns {
        let Some(relative) = vars.render(pattern) else {
            continue;
        };
        let path = base_path.join(relative);
        if is_file(&path).await {
            return Some(path);
        }
    }
    None
}

/// Read a file's contents as a string.
pub async fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_with_path(e, path))
}

/// Check if a path exists and is a regular file.
pub async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Check if a path exists and is a directory.
pub async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pattern_vars_render() {
        let vars = PatternVars::new().with("page", "45").with("id", "45-2");
        assert_eq!(
            vars.render("page_{page}/tables/{id}.png").as_deref(),
            Some("page_45/tables/45-2.png")
        );
    }

    #[test]
    fn test_pattern_vars_render_unknown_placeholder() {
        let vars = PatternVars::new().with("page", "45");
        assert!(vars.render("page_{page}/{missing}.png").is_none());
    }

    #[tokio::test]
    async fn test_find_first_match_in_order() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("page_7").join("images");
        fs::create_dir_all(&images).await.unwrap();
        fs::write(images.join("image-7-3.png"), b"png").await.unwrap();

        let vars = PatternVars::new()
            .with("page", "7")
            .with("id", "Fig-3")
            .with("suffix", "3");
        let found = find_first_match(
            temp.path(),
            &[
                "page_{page}/images/{id}.png",
                "page_{page}/images/image-{page}-{suffix}.png",
            ],
            &vars,
        )
        .await;

        assert_eq!(found, Some(images.join("image-7-3.png")));
    }

    #[tokio::test]
    async fn test_find_first_match_prefers_earlier_pattern() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").await.unwrap();
        fs::write(temp.path().join("b.txt"), "b").await.unwrap();

        let vars = PatternVars::new();
        let found = find_first_match(temp.path(), &["a.txt", "b.txt"], &vars).await;
        assert_eq!(found, Some(temp.path().join("a.txt")));
    }

    #[tokio::test]
    async fn test_find_first_match_missing_base() {
        let vars = PatternVars::new().with("id", "x");
        let found = find_first_match(
            Path::new("/nonexistent/gigo/scratch"),
            &["{id}.png"],
            &vars,
        )
        .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_first_match_ignores_directories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("x.png")).await.unwrap();

        let vars = PatternVars::new().with("id", "x");
        assert!(find_first_match(temp.path(), &["{id}.png"], &vars).await.is_none());
    }

    #[tokio::test]
    async fn test_read_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("table.html");
        fs::write(&file_path, "<table></table>").await.unwrap();

        assert_eq!(read_file(&file_path).await.unwrap(), "<table></table>");
        assert!(read_file(&temp.path().join("missing.html")).await.is_err());
    }

    #[test]
    fn test_pattern_vars_render_keeps_braces_in_values() {
        let vars = PatternVars::new().with("page", "12").with("label", "12-{a}");
        assert_eq!(
            vars.render("page_{page}/images/{label}.png").as_deref(),
            Some("page_12/images/12-{a}.png")
        );
    }

    #[test]
    fn test_pattern_vars_render_rejects_unsafe_values() {
        for bad in ["../45-2", "..", "45/2", "45\\2", "", "."] {
            let vars = PatternVars::new().with("page", "45").with("id", bad);
            assert!(vars.render("page_{page}/tables/{id}.html").is_none(), "{bad:?}");
        }
        assert!(is_safe_segment("Fig.3"));
        assert!(is_safe_segment("45-2"));
    }

    #[tokio::test]
    async fn test_find_first_match_does_not_escape_base() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("scratch");
        fs::create_dir_all(base.join("page_1")).await.unwrap();
        fs::write(temp.path().join("secret.html"), "x").await.unwrap();

        let vars = PatternVars::new().with("page", "1").with("id", "../../secret");
        assert!(find_first_match(&base, &["page_{page}/{id}.html"], &vars).await.is_none());
    }

    #[tokio::test]
    async fn test_file_kinds() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("exists.png");
        fs::write(&file_path, "content").await.unwrap();

        assert!(is_file(&file_path).await);
        assert!(!is_dir(&file_path).await);
        assert!(is_dir(temp.path()).await);
        assert!(!is_file(&temp.path().join("nonexistent.png")).await);
    }
}
