//! Reference resolution: extract, merge, correlate.

use futures::future::join_all;
use std::collections::HashMap;
use std::path::Path;

use gigo_retrieval::{CandidateRecord, RankedList};

use crate::correlate::{FileLocator, ScratchDirLocator};
use crate::extractors::{ReferenceExtractor, default_extractors};
use crate::models::{Reference, ReferenceKey};

/// Turns retrieved candidates into deduplicated, file-correlated references.
///
/// Resolution is a pure function of the candidates and the files on disk:
/// running it twice over the same inputs yields the same output.
pub struct ReferenceResolver {
    extractors: Vec<Box<dyn ReferenceExtractor>>,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    /// A resolver running the five standard extractors.
    pub fn new() -> Self {
        Self {
            extractors: default_extractors(),
        }
    }

    /// A resolver running a custom, ordered set of extractors.
    pub fn with_extractors(extractors: Vec<Box<dyn ReferenceExtractor>>) -> Self {
        Self { extractors }
    }

    /// Resolve references for candidates of a single query.
    pub async fn resolve(&self, candidates: &[CandidateRecord], scratch_path: &Path) -> Vec<Reference> {
        let locator = ScratchDirLocator::new(scratch_path);
        self.resolve_with(candidates.iter().map(|c| (None, c)), &locator)
            .await
    }

    /// Resolve references across the results of several sub-questions.
    ///
    /// Each reference remembers the first sub-question that produced it.
    pub async fn resolve_grouped(
        &self,
        groups: &[(String, RankedList)],
        scratch_path: &Path,
    ) -> Vec<Reference> {
        let locator = ScratchDirLocator::new(scratch_path);
        let tagged = groups
            .iter()
            .flat_map(|(sub_question, list)| list.iter().map(move |c| (Some(sub_question.as_str()), c)));
        self.resolve_with(tagged, &locator).await
    }

    /// Resolve with an arbitrary file locator.
    pub async fn resolve_with<'a, I>(&self, candidates: I, locator: &dyn FileLocator) -> Vec<Reference>
    where
        I: IntoIterator<Item = (Option<&'a str>, &'a CandidateRecord)>,
    {
        let extracted = self.extract_all(candidates);
        let mut merged = merge(extracted);

        if !locator.available().await {
            log::debug!("File store unavailable; {} references left uncorrelated", merged.len());
            return merged;
        }

        let located = join_all(merged.iter().map(|r| locator.locate(r))).await;
        for (reference, files) in merged.iter_mut().zip(located) {
            reference.files = files;
        }

        log::debug!(
            "Resolved {} references ({} with files)",
            merged.len(),
            merged.iter().filter(|r| !r.files.is_empty()).count()
        );
        merged
    }

    /// Run every extractor over every candidate, in candidate order, then
    /// extractor order, then payload order.
    fn extract_all<'a, I>(&self, candidates: I) -> Vec<Reference>
    where
        I: IntoIterator<Item = (Option<&'a str>, &'a CandidateRecord)>,
    {
        let mut references = Vec::new();
        for (sub_question, candidate) in candidates {
            for extractor in &self.extractors {
                for reference in extractor.extract(candidate) {
                    references.push(match sub_question {
                        Some(q) => reference.with_sub_question(q),
                        None => reference,
                    });
                }
            }
        }
        references
    }
}

/// Collapse references sharing an identity key, keeping first-appearance
/// order and filling empty fields from later duplicates.
pub fn merge(references: Vec<Reference>) -> Vec<Reference> {
    let mut merged: Vec<Reference> = Vec::with_capacity(references.len());
    let mut index: HashMap<ReferenceKey, usize> = HashMap::new();

    for reference in references {
        let Some(key) = reference.key() else {
            continue;
        };
        match index.get(&key) {
            Some(&pos) => merged[pos].merge_from(&reference),
            None => {
                index.insert(key, merged.len());
                merged.push(reference);
            }
        }
    }

    merged
}

// ============================================================================
// Tests
// ============================================================================
