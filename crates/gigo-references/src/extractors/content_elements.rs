//! Tables and figures from `content_elements`.

use gigo_retrieval::CandidateRecord;

use super::{ReferenceExtractor, first_id, object_entries, skip_malformed, text_field};
use crate::models::Reference;

const FIELD: &str = "content_elements";

/// Reads typed page elements: `type: "table"` entries by `element_id`,
/// `type: "figure"` entries by `figure_id` (or `label`). Other element
/// types are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentElementsExtractor;

impl ReferenceExtractor for ContentElementsExtractor {
    fn extract(&self, candidate: &CandidateRecord) -> Vec<Reference> {
        let page = candidate.page_number();
        let mut references = Vec::new();

        for element in object_entries(self.name(), candidate, FIELD) {
            let title = text_field(element, &["title", "caption"]);
            let reference = match element.get("type").and_then(|t| t.as_str()) {
                Some("table") => first_id(element, &["element_id"])
                    .map(|id| id.map(|id| Reference::table(id).with_title(title))),
                Some("figure") => first_id(element, &["figure_id", "label"])
                    .map(|label| label.map(|label| Reference::figure(label).with_title(title))),
                _ => Ok(None),
            };

            match reference {
                Ok(Some(reference)) => references.push(reference.with_page(page)),
                Ok(None) => {}
                Err(e) => skip_malformed(self.name(), candidate, &e),
            }
        }

        references
    }

    fn name(&self) -> &str {
        FIELD
    }
}
