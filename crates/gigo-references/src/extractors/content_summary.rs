//! Figures from `content_summary.figures`.

use serde_json::Value;

use gigo_core::Error;
use gigo_retrieval::CandidateRecord;

use super::{ReferenceExtractor, first_id, skip_malformed, text_field};
use crate::models::{Reference, is_valid_id};

const FIELD: &str = "content_summary";

/// Reads the page summary's figure list. Entries are either plain labels or
/// objects with `label` (or `figure_id`) and an optional `title`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSummaryExtractor;

impl ContentSummaryExtractor {
    fn figure(&self, entry: &Value) -> Result<Option<Reference>, Error> {
        match entry {
            Value::String(label) if is_valid_id(label) => Ok(Some(Reference::figure(label.trim()))),
            Value::String(_) => Ok(None),
            Value::Object(obj) => Ok(first_id(obj, &["label", "figure_id"])?
                .map(|label| Reference::figure(label).with_title(text_field(obj, &["title", "caption"])))),
            other => Err(Error::malformed(
                "content_summary.figures",
                format!("unexpected figure entry: {other}"),
            )),
        }
    }
}

impl ReferenceExtractor for ContentSummaryExtractor {
    fn extract(&self, candidate: &CandidateRecord) -> Vec<Reference> {
        let Some(summary) = candidate.field(FIELD) else {
            return Vec::new();
        };
        let Some(summary) = summary.as_object() else {
            skip_malformed(
                self.name(),
                candidate,
                &Error::malformed(FIELD, "expected an object"),
            );
            return Vec::new();
        };
        let Some(figures) = summary.get("figures").filter(|f| !f.is_null()) else {
            return Vec::new();
        };
        let Some(figures) = figures.as_array() else {
            skip_malformed(
                self.name(),
                candidate,
                &Error::malformed("content_summary.figures", "expected an array"),
            );
            return Vec::new();
        };

        let page = candidate.page_number();
        figures
            .iter()
            .filter_map(|entry| match self.figure(entry) {
                Ok(reference) => reference.map(|r| r.with_page(page)),
                Err(e) => {
                    skip_malformed(self.name(), candidate, &e);
                    None
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        FIELD
    }
}
