//! Evidence gathering: decompose, retrieve per sub-question, resolve references.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use gigo_core::Result;
use gigo_references::{Reference, ReferenceResolver};
use gigo_retrieval::{CandidateRecord, RankedList, RetrievalRequest, RetrievalStrategy};

use crate::decompose::{QueryDecomposer, QueryDecomposition};

/// Retrieved candidates for one sub-question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestionEvidence {
    /// The sub-question that was retrieved.
    pub sub_question: String,
    /// Its ranked candidates.
    pub records: RankedList,
}

/// Everything retrieved for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// How the question was split.
    pub decomposition: QueryDecomposition,
    /// Per-sub-question results, in decomposition order.
    pub results: Vec<SubQuestionEvidence>,
    /// References over all results, deduplicated.
    pub references: Vec<Reference>,
}

impl Evidence {
    /// Unique records across sub-questions, in first-appearance order.
    pub fn records(&self) -> Vec<&CandidateRecord> {
        let mut seen = HashSet::new();
        self.results
            .iter()
            .flat_map(|r| r.records.iter())
            .filter(|record| seen.insert(record.id.as_str()))
            .collect()
    }

    /// Whether no sub-question retrieved anything.
    pub fn is_empty(&self) -> bool {
        self.results.iter().all(|r| r.records.is_empty())
    }
}

/// Runs a retrieval strategy over a question's sub-questions.
#[derive(Clone)]
pub struct EvidenceService {
    strategy: Arc<dyn RetrievalStrategy>,
    template: RetrievalRequest,
    resolver: Arc<ReferenceResolver>,
    scratch_path: PathBuf,
    decomposer: Option<QueryDecomposer>,
}

impl EvidenceService {
    /// Create a service without decomposition.
    ///
    /// `template` carries the limits, threshold and collection applied to
    /// every sub-question; its query text is replaced per call.
    pub fn new(
        strategy: Arc<dyn RetrievalStrategy>,
        template: RetrievalRequest,
        scratch_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strategy,
            template,
            resolver: Arc::new(ReferenceResolver::new()),
            scratch_path: scratch_path.into(),
            decomposer: None,
        }
    }

    /// Decompose questions before retrieval.
    pub fn with_decomposer(mut self, decomposer: QueryDecomposer) -> Self {
        self.decomposer = Some(decomposer);
        self
    }

    /// Use a custom reference resolver.
    pub fn with_resolver(mut self, resolver: ReferenceResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Name of the underlying strategy.
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Gather evidence for `question`.
    ///
    /// Sub-questions are retrieved concurrently; the first failure aborts
    /// the whole call. Request parameters are validated once, before any
    /// external call.
    pub async fn gather(&self, question: &str) -> Result<Evidence> {
        self.template.for_query(question).validate()?;

        let decomposition = match &self.decomposer {
            Some(decomposer) => decomposer.decompose(question).await?,
            None => QueryDecomposition::identity(question),
        };

        let lists = try_join_all(
            decomposition
                .sub_questions()
                .map(|q| self.retrieve(q)),
        )
        .await?;

        let results: Vec<SubQuestionEvidence> = decomposition
            .sub_questions()
            .zip(lists)
            .map(|(q, records)| SubQuestionEvidence {
                sub_question: q.to_string(),
                records,
            })
            .collect();

        let groups: Vec<(String, RankedList)> = results
            .iter()
            .map(|r| (r.sub_question.clone(), r.records.clone()))
            .collect();
        let references = self.resolver.resolve_grouped(&groups, &self.scratch_path).await;

        log::info!(
            "Gathered {} records and {} references for {} sub-questions via {}",
            results.iter().map(|r| r.records.len()).sum::<usize>(),
            references.len(),
            results.len(),
            self.strategy.name()
        );

        Ok(Evidence {
            decomposition,
            results,
            references,
        })
    }

    /// Retrieve one query with the template's parameters.
    pub async fn retrieve(&self, query: &str) -> Result<RankedList> {
        self.strategy.retrieve(&self.template.for_query(query)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
