//! Figures cross-referenced through `within_page_relations`.

use gigo_retrieval::CandidateRecord;
use serde_json::Value;

use super::{ReferenceExtractor, first_id, object_array, object_entries, skip_malformed, text_field};
use crate::models::Reference;

const FIELD: &str = "within_page_relations";
const RELATED: &str = "related_figures";

/// Reads `related_figures[*].label` from the page-level relations block and
/// from each content element's own relations block, in that order.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithinPageRelationsExtractor;

impl WithinPageRelationsExtractor {
    fn related(&self, candidate: &CandidateRecord, relations: &Value, out: &mut Vec<Reference>) {
        let Some(related) = relations.get(RELATED) else {
            return;
        };
        for figure in object_array(self.name(), candidate, RELATED, related) {
            match first_id(figure, &["label", "figure_id"]) {
                Ok(Some(label)) => out.push(
                    Reference::figure(label).with_title(text_field(figure, &["title", "caption"])),
                ),
                Ok(None) => {}
                Err(e) => skip_malformed(self.name(), candidate, &e),
            }
        }
    }
}

impl ReferenceExtractor for WithinPageRelationsExtractor {
    fn extract(&self, candidate: &CandidateRecord) -> Vec<Reference> {
        let mut references = Vec::new();

        if let Some(relations) = candidate.field(FIELD) {
            self.related(candidate, relations, &mut references);
        }

        for element in object_entries(self.name(), candidate, "content_elements") {
            if let Some(relations) = element.get(FIELD) {
                self.related(candidate, relations, &mut references);
            }
        }

        let page = candidate.page_number();
        references.into_iter().map(|r| r.with_page(page)).collect()
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
    fn test_within_page_relations_page_and_element_level() {
        let candidate = CandidateRecord::new("p45", 8.0).with_payload(json!({
            "page_number": 45,
            "within_page_relations": {
                "related_figures": [{"label": "Fig-45-1"}]
            },
            "content_elements": [
                {"type": "table", "element_id": "45-2",
                 "within_page_relations": {"related_figures": [{"label": "Fig-45-3"}, {"label": "None"}]}},
                {"type": "text"}
            ]
        }));

        let refs = WithinPageRelationsExtractor.extract(&candidate);
        let labels: Vec<&str> = refs.iter().filter_map(|r| r.label.as_deref()).collect();

        assert_eq!(labels, vec!["Fig-45-1", "Fig-45-3"]);
        assert!(refs.iter().all(|r| r.page_number == Some(45)));
    }

    #[test]
    fn test_within_page_relations_malformed_related_list() {
        let candidate = CandidateRecord::new("p1", 1.0).with_payload(json!({
            "page_number": 1,
            "within_page_relations": {"related_figures": "Fig-1"},
            "content_elements": [
                {"within_page_relations": {"related_figures": [{"label": "Fig-1-2"}, 5]}}
            ]
        }));

        let refs = WithinPageRelationsExtractor.extract(&candidate);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].label.as_deref(), Some("Fig-1-2"));
    }

    #[test]
    fn test_within_page_relations_absent() {
        let candidate = CandidateRecord::new("p1", 1.0).with_payload(json!({"page_number": 1}));
        assert!(WithinPageRelationsExtractor.extract(&candidate).is_empty());
    }
}
