//! Tables from `flattened_tables`.

use gigo_retrieval::CandidateRecord;

use super::{ReferenceExtractor, first_id, object_entries, skip_malformed};
use crate::models::Reference;

const FIELD: &str = "flattened_tables";

/// Reads flattened table text blocks by `table_id`.
///
/// Contributes no title: the table metadata title is authoritative.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenedTablesExtractor;

impl ReferenceExtractor for FlattenedTablesExtractor {
    fn extract(&self, candidate: &CandidateRecord) -> Vec<Reference> {
        let page = candidate.page_number();
        object_entries(self.name(), candidate, FIELD)
            .into_iter()
            .filter_map(|table| match first_id(table, &["table_id"]) {
                Ok(id) => id.map(|id| Reference::table(id).with_page(page)),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_tables() {
        let candidate = CandidateRecord::new("p12", 2.0).with_payload(json!({
            "page_number": 12,
            "flattened_tables": [
                {"table_id": "12-1", "title": "ignored", "text": "Torque | 25 Nm"},
                {"table_id": ""},
                {"text": "no id"},
                {"table_id": 4}
            ]
        }));

        let refs = FlattenedTablesExtractor.extract(&candidate);

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].element_id.as_deref(), Some("12-1"));
        assert_eq!(refs[0].title, None);
        assert_eq!(refs[0].page_number, Some(12));
        assert_eq!(refs[1].element_id.as_deref(), Some("4"));
    }
}
