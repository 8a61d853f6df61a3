//! Reference data model.
//!
//! A [`Reference`] points at a table or figure in the processed document
//! that a retrieved page mentions. References are built by extractors,
//! merged by identity key, then finalized by file correlation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Whether a reference names a table or a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A table, with HTML and PNG renderings.
    Table,
    /// A figure, with a PNG rendering.
    Figure,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Figure => f.write_str("figure"),
        }
    }
}

/// Files found on disk for a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePaths {
    /// HTML rendering (tables only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<PathBuf>,

    /// PNG rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png: Option<PathBuf>,
}

impl FilePaths {
    /// Whether no file was found.
    pub fn is_empty(&self) -> bool {
        self.html.is_none() && self.png.is_none()
    }
}

/// The key under which duplicate references are merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey {
    /// Table or figure.
    pub kind: ReferenceKind,
    /// `element_id` when present, otherwise `label`.
    pub identifier: String,
    /// Page the reference was found on.
    pub page_number: Option<u32>,
}

/// A table or figure reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Table or figure.
    pub kind: ReferenceKind,

    /// Element identifier assigned during ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,

    /// Printed label, e.g. "45-2" or "Figure 3".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Page the reference was found on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    /// Caption or title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The first sub-question whose results mentioned this reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_question: Option<String>,

    /// Files found on disk.
    #[serde(default)]
    pub files: FilePaths,
}

/// Whether an identifier extracted from a payload is usable.
///
/// Empty strings and the literal `"None"` written by upstream serializers
/// are rejected.
pub fn is_valid_id(identifier: &str) -> bool {
    let trimmed = identifier.trim();
    !trimmed.is_empty() && trimmed != "None"
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Reference {
    fn new(kind: ReferenceKind) -> Self {
        Self {
            kind,
            element_id: None,
            label: None,
            page_number: None,
            title: None,
            sub_question: None,
            files: FilePaths::default(),
        }
    }

    /// A table reference identified by element id.
    pub fn table(element_id: impl Into<String>) -> Self {
        Self::new(ReferenceKind::Table).with_element_id(element_id)
    }

    /// A table reference known only by its printed label.
    pub fn table_labelled(label: impl Into<String>) -> Self {
        Self::new(ReferenceKind::Table).with_label(label)
    }

    /// A figure reference known by its label.
    pub fn figure(label: impl Into<String>) -> Self {
        Self::new(ReferenceKind::Figure).with_label(label)
    }

    /// Set the element id. Invalid ids are ignored.
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into()).filter(|id| is_valid_id(id));
        self
    }

    /// Set the label. Invalid labels are ignored.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into()).filter(|l| is_valid_id(l));
        self
    }

    /// Set the page number.
    pub fn with_page(mut self, page_number: Option<u32>) -> Self {
        self.page_number = page_number;
        self
    }

    /// Set the title. Blank titles are ignored.
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = non_empty(title);
        self
    }

    /// Tag with the sub-question that produced this reference.
    pub fn with_sub_question(mut self, sub_question: impl Into<String>) -> Self {
        self.sub_question = non_empty(Some(sub_question.into()));
        self
    }

    /// The identifier used for identity and file lookup.
    pub fn identifier(&self) -> Option<&str> {
        self.element_id.as_deref().or(self.label.as_deref())
    }

    /// The identity key, or `None` when the reference has no identifier.
    pub fn key(&self) -> Option<ReferenceKey> {
        self.identifier().map(|identifier| ReferenceKey {
            kind: self.kind,
            identifier: identifier.to_string(),
            page_number: self.page_number,
        })
    }

    /// Fill every empty field from `other`; fields already set are kept.
    pub fn merge_from(&mut self, other: &Reference) {
        fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(other);
            }
        }
        fill(&mut self.element_id, &other.element_id);
        fill(&mut self.label, &other.label);
        fill(&mut self.page_number, &other.page_number);
        fill(&mut self.title, &other.title);
        fill(&mut self.sub_question, &other.sub_question);
        fill(&mut self.files.html, &other.files.html);
        fill(&mut self.files.png, &other.files.png);
    }
}

// ============================================================================
// Tests
// ============================================================================
