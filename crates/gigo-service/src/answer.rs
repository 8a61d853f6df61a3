//! Answer synthesis over gathered evidence.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use gigo_core::Result;
use gigo_references::Reference;

use crate::evidence::{Evidence, EvidenceService};
use crate::llm::{CompletionRequest, LlmProvider};
use crate::prompts::{NO_EVIDENCE_ANSWER, answer_prompt};

/// Default generation budget for answers.
pub const DEFAULT_ANSWER_MAX_TOKENS: u32 = 10_000;

/// A synthesized answer with the references that support it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text.
    pub answer: String,
    /// Tables and figures from the retrieved pages.
    pub references: Vec<Reference>,
}

/// Writes answers from retrieved evidence with an LLM.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
}

impl AnswerSynthesizer {
    /// Create a synthesizer.
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            max_tokens: DEFAULT_ANSWER_MAX_TOKENS,
        }
    }

    /// Override the generation budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Answer `question` from `evidence`.
    ///
    /// Records without embedded text contribute nothing to the prompt. With
    /// no usable text at all the LLM is not called.
    pub async fn synthesize(&self, question: &str, evidence: Evidence) -> Result<Answer> {
        let records = evidence.records();
        let points: Vec<&str> = records.iter().filter_map(|r| r.embedding_text()).collect();

        if points.is_empty() {
            log::info!("No evidence text for question; skipping answer generation");
            return Ok(Answer {
                answer: NO_EVIDENCE_ANSWER.to_string(),
                references: evidence.references,
            });
        }

        let request = CompletionRequest::prompt(answer_prompt(question, &points))
            .with_temperature(0.0)
            .with_max_tokens(self.max_tokens);
        let response = self.llm.complete(request).await?;

        log::debug!(
            "{} answered from {} points ({} tokens)",
            self.llm.name(),
            points.len(),
            response.tokens_used.total()
        );

        Ok(Answer {
            answer: response.content,
            references: evidence.references,
        })
    }
}

/// Question answering: gather evidence, then synthesize.
#[derive(Clone)]
pub struct QuestionAnswerer {
    evidence: EvidenceService,
    synthesizer: AnswerSynthesizer,
}

impl QuestionAnswerer {
    /// Combine an evidence service and a synthesizer.
    pub fn new(evidence: EvidenceService, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            evidence,
            synthesizer,
        }
    }

    /// Answer `question`.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let evidence = self.evidence.gather(question).await?;
        self.synthesizer.synthesize(question, evidence).await
    }
}

// ============================================================================
// Tests
// ============================================================================
