//! Reference extractors.
//!
//! Each extractor reads one payload structure of a [`CandidateRecord`] and
//! emits the table/figure references it mentions. Extractors are
//! independent: a missing field yields nothing, and a malformed entry is
//! logged and skipped without affecting the rest of the payload.
//!
//! The resolver runs them in the order returned by [`default_extractors`];
//! that order decides which source's non-empty fields win on merge.

mod content_elements;
mod content_summary;
mod flattened_tables;
mod table_metadata;
mod within_page_relations;

pub use content_elements::ContentElementsExtractor;
pub use content_summary::ContentSummaryExtractor;
pub use flattened_tables::FlattenedTablesExtractor;
pub use table_metadata::TableMetadataExtractor;
pub use within_page_relations::WithinPageRelationsExtractor;

use gigo_core::{Error, Result};
use gigo_retrieval::CandidateRecord;
use serde_json::{Map, Value};

use crate::models::{Reference, is_valid_id};

/// Trait for extracting references from one payload structure.
pub trait ReferenceExtractor: Send + Sync {
    /// Extract references, in the order they appear in the payload.
    ///
    /// Never fails: unusable entries are skipped.
    fn extract(&self, candidate: &CandidateRecord) -> Vec<Reference>;

    /// Returns the name of this extractor for logging/debugging.
    fn name(&self) -> &str;
}

/// The five extractors in resolution order.
pub fn default_extractors() -> Vec<Box<dyn ReferenceExtractor>> {
    vec![
        Box::new(ContentElementsExtractor),
        Box::new(FlattenedTablesExtractor),
        Box::new(TableMetadataExtractor),
        Box::new(ContentSummaryExtractor),
        Box::new(WithinPageRelationsExtractor),
    ]
}

// ============================================================================
// Payload helpers
// ============================================================================

/// Log and drop a malformed entry.
pub(crate) fn skip_malformed(extractor: &str, candidate: &CandidateRecord, err: &Error) {
    log::warn!("{extractor}: skipping entry in record {}: {err}", candidate.id);
}

/// Entries of an array-valued payload field, each required to be an object.
///
/// A missing field yields nothing. A non-array value, or a non-object entry,
/// is reported through `skip_malformed`.
pub(crate) fn object_entries<'a>(
    extractor: &str,
    candidate: &'a CandidateRecord,
    field: &str,
) -> Vec<&'a Map<String, Value>> {
    match candidate.field(field) {
        None => Vec::new(),
        Some(value) => object_array(extractor, candidate, field, value),
    }
}

/// Object entries of an array value found anywhere in a payload.
pub(crate) fn object_array<'a>(
    extractor: &str,
    candidate: &CandidateRecord,
    field: &str,
    value: &'a Value,
) -> Vec<&'a Map<String, Value>> {
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            skip_malformed(
                extractor,
                candidate,
                &Error::malformed(field, format!("expected an array, found {}", type_name(value))),
            );
        }
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item.as_object() {
            Some(obj) => Some(obj),
            None => {
                skip_malformed(
                    extractor,
                    candidate,
                    &Error::malformed(field, format!("expected an object, found {}", type_name(item))),
                );
                None
            }
        })
        .collect()
}

/// An identifier field: strings and integers are accepted, absent or null
/// yields `None`, and invalid ids (empty, `"None"`) are treated as absent.
pub(crate) fn id_field(entry: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    let id = match entry.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        Some(other) => {
            return Err(Error::malformed(
                field,
                format!("expected a string id, found {}", type_name(other)),
            ));
        }
    };
    Ok(id.filter(|id| is_valid_id(id)))
}

/// The first present identifier among `fields`.
pub(crate) fn first_id(entry: &Map<String, Value>, fields: &[&str]) -> Result<Option<String>> {
    for field in fields {
        if let Some(id) = id_field(entry, field)? {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// The first non-blank string among `fields`.
pub(crate) fn text_field(entry: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| entry.get(*f).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================
