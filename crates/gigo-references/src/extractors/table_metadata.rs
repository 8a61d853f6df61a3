//! Tables from `table_metadata`.

use gigo_retrieval::CandidateRecord;
use gigo_retrieval::types::value_as_page;

use super::{ReferenceExtractor, first_id, object_entries, skip_malformed, text_field};
use crate::models::Reference;

const FIELD: &str = "table_metadata";

/// Reads LLM-generated table metadata: `table_id` (or `element_id`),
/// printed `label` and `title`. An entry's own `page_number` overrides the
/// record's.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableMetadataExtractor;

impl ReferenceExtractor for TableMetadataExtractor {
    fn extract(&self, candidate: &CandidateRecord) -> Vec<Reference> {
        let record_page = candidate.page_number();
        let mut references = Vec::new();

        for table in object_entries(self.name(), candidate, FIELD) {
            let ids = first_id(table, &["table_id", "element_id"])
                .and_then(|id| first_id(table, &["label"]).map(|label| (id, label)));
            let (id, label) = match ids {
                Ok(ids) => ids,
                Err(e) => {
                    skip_malformed(self.name(), candidate, &e);
                    continue;
                }
            };

            let reference = match (id, label) {
                (Some(id), Some(label)) => Reference::table(id).with_label(label),
                (Some(id), None) => Reference::table(id),
                (None, Some(label)) => Reference::table_labelled(label),
                (None, None) => continue,
            };

            let page = table
                .get("page_number")
                .and_then(value_as_page)
                .or(record_page);

            references.push(
                reference
                    .with_page(page)
                    .with_title(text_field(table, &["title", "caption"])),
            );
        }

        references
    }

    fn name(&self) -> &str {
        FIELD
    }
}
