//! File correlation.
//!
//! Maps a reference's `(page_number, identifier)` to the rendered files the
//! ingestion pipeline wrote under a scratch directory:
//!
//! ```text
//! <scratch>/page_{n}/tables/{id}.html
//! <scratch>/page_{n}/tables/{id}.png
//! <scratch>/page_{n}/images/{label}.png
//! <scratch>/page_{n}/images/image-{n}-{suffix}.png
//! ```
//!
//! where `suffix` is the last `-`-separated segment of a figure label.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use gigo_core::PatternVars;
use gigo_core::util::files::{find_first_match, is_dir, is_safe_segment};

use crate::models::{FilePaths, Reference, ReferenceKind};

const TABLE_HTML: &[&str] = &["page_{page}/tables/{id}.html", "page_{page}/tables/{label}.html"];
const TABLE_PNG: &[&str] = &["page_{page}/tables/{id}.png", "page_{page}/tables/{label}.png"];
const FIGURE_PNG: &[&str] = &[
    "page_{page}/images/{label}.png",
    "page_{page}/images/image-{page}-{suffix}.png",
];

/// Lookup from a reference to its files on disk.
#[async_trait]
pub trait FileLocator: Send + Sync {
    /// Files for `reference`. Empty when nothing matches.
    async fn locate(&self, reference: &Reference) -> FilePaths;

    /// Whether the locator's backing store is reachable at all.
    async fn available(&self) -> bool {
        true
    }
}

/// Locates files under a processed-document scratch directory.
#[derive(Debug, Clone)]
pub struct ScratchDirLocator {
    root: PathBuf,
}

impl ScratchDirLocator {
    /// Create a locator rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The scratch directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Placeholder values for a reference, or `None` without a page number.
fn pattern_vars(reference: &Reference) -> Option<PatternVars> {
    let page = reference.page_number?;
    let mut vars = PatternVars::new().with("page", page.to_string());
    match reference.kind {
        ReferenceKind::Table => {
            if let Some(id) = &reference.element_id {
                vars = vars.with("id", id.clone());
            }
            if let Some(label) = &reference.label {
                vars = vars.with("label", label.clone());
            }
        }
        ReferenceKind::Figure => {
            let label = reference.identifier()?;
            let suffix = label.rsplit('-').next().unwrap_or(label);
            vars = vars.with("label", label).with("suffix", suffix);
        }
    }
    Some(vars)
}

#[async_trait]
impl FileLocator for ScratchDirLocator {
    async fn locate(&self, reference: &Reference) -> FilePaths {
        let identifiers = [reference.element_id.as_deref(), reference.label.as_deref()];
        if let Some(bad) = identifiers.into_iter().flatten().find(|i| !is_safe_segment(i)) {
            log::warn!("Not correlating reference with unsafe identifier {bad:?}");
            return FilePaths::default();
        }
        let Some(vars) = pattern_vars(reference) else {
            return FilePaths::default();
        };
        match reference.kind {
            ReferenceKind::Table => {
                let (html, png) = futures::join!(
                    find_first_match(&self.root, TABLE_HTML, &vars),
                    find_first_match(&self.root, TABLE_PNG, &vars),
                );
                FilePaths { html, png }
            }
            ReferenceKind::Figure => FilePaths {
                html: None,
                png: find_first_match(&self.root, FIGURE_PNG, &vars).await,
            },
        }
    }

    async fn available(&self) -> bool {
        is_dir(&self.root).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    async fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(&path, b"x").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_locate_rejects_identifiers_leaving_the_page_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("page_45").join("tables")).await.unwrap();
        touch(temp.path(), "page_45/45-2.html").await;
        let locator = ScratchDirLocator::new(temp.path());

        let reference = Reference::table_labelled("../45-2").with_page(Some(45));
        assert!(locator.locate(&reference).await.is_empty());

        let figure = Reference::figure("a/b").with_page(Some(45));
        assert!(locator.locate(&figure).await.is_empty());
    }

    #[tokio::test]
    async fn test_locate_table_by_label() {
        let temp = TempDir::new().unwrap();
        let html = touch(temp.path(), "page_45/tables/45-2.html").await;
        let locator = ScratchDirLocator::new(temp.path());

        let reference = Reference::table_labelled("45-2").with_page(Some(45));
        let files = locator.locate(&reference).await;

        assert_eq!(files.html, Some(html));
        assert_eq!(files.png, None);
    }

    #[tokio::test]
    async fn test_locate_table_prefers_element_id() {
        let temp = TempDir::new().unwrap();
        let by_id = touch(temp.path(), "page_3/tables/tbl-1.png").await;
        touch(temp.path(), "page_3/tables/3-1.png").await;
        let locator = ScratchDirLocator::new(temp.path());

        let reference = Reference::table("tbl-1").with_label("3-1").with_page(Some(3));
        assert_eq!(locator.locate(&reference).await.png, Some(by_id));
    }

    #[tokio::test]
    async fn test_locate_figure_conventions() {
        let temp = TempDir::new().unwrap();
        let direct = touch(temp.path(), "page_7/images/Fig-7-1.png").await;
        let numbered = touch(temp.path(), "page_7/images/image-7-2.png").await;
        let locator = ScratchDirLocator::new(temp.path());

        let first = Reference::figure("Fig-7-1").with_page(Some(7));
        assert_eq!(locator.locate(&first).await.png, Some(direct));

        let second = Reference::figure("Figure-2").with_page(Some(7));
        let files = locator.locate(&second).await;
        assert_eq!(files.png, Some(numbered));
        assert_eq!(files.html, None);
    }

    #[tokio::test]
    async fn test_locate_without_page_or_match() {
        let temp = TempDir::new().unwrap();
        let locator = ScratchDirLocator::new(temp.path());

        assert!(locator.locate(&Reference::table("1-1")).await.is_empty());
        assert!(
            locator
                .locate(&Reference::figure("Fig-9").with_page(Some(9)))
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_missing_scratch_dir() {
        let locator = ScratchDirLocator::new("/nonexistent/gigo/scratch");
        assert!(!locator.available().await);
        let reference = Reference::table("1-1").with_page(Some(1));
        assert!(locator.locate(&reference).await.is_empty());
    }
}
