//! Query decomposition.
//!
//! An LLM splits a user question into a handful of sub-questions, each
//! anchored to a section of the document outline. Every sub-question is then
//! retrieved independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use gigo_core::Result;

use crate::llm::{CompletionRequest, LlmProvider};
use crate::prompts::{DECOMPOSITION_SYSTEM_PROMPT, OutlineSection, decomposition_prompt};

/// Default cap on sub-questions per question.
pub const DEFAULT_MAX_SUB_QUESTIONS: usize = 4;

/// One sub-question and the outline location it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    /// The sub-question text.
    pub sub_question: String,
    /// Matched section number (0 when unknown).
    #[serde(default)]
    pub section_number: u32,
    /// Matched section title.
    #[serde(default)]
    pub section_title: String,
    /// Matched chapter titles.
    #[serde(default)]
    pub matched_chapters: Vec<String>,
}

impl SubQuestion {
    /// A sub-question with no outline mapping.
    pub fn unmapped(text: impl Into<String>) -> Self {
        Self {
            sub_question: text.into(),
            section_number: 0,
            section_title: String::new(),
            matched_chapters: Vec::new(),
        }
    }
}

/// A question and its sub-questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDecomposition {
    /// The user's question.
    pub original_question: String,
    /// Sub-questions, never empty.
    pub decomposed_questions: Vec<SubQuestion>,
}

impl QueryDecomposition {
    /// The trivial decomposition: the question itself.
    pub fn identity(question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            decomposed_questions: vec![SubQuestion::unmapped(question.clone())],
            original_question: question,
        }
    }

    /// Sub-question texts in order.
    pub fn sub_questions(&self) -> impl Iterator<Item = &str> {
        self.decomposed_questions.iter().map(|q| q.sub_question.as_str())
    }
}

/// Decomposes questions with an LLM.
#[derive(Clone)]
pub struct QueryDecomposer {
    llm: Arc<dyn LlmProvider>,
    outline: Vec<OutlineSection>,
    max_sub_questions: usize,
    max_tokens: u32,
}

impl QueryDecomposer {
    /// Create a decomposer with no outline.
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            outline: Vec::new(),
            max_sub_questions: DEFAULT_MAX_SUB_QUESTIONS,
            max_tokens: 2048,
        }
    }

    /// Anchor sub-questions to this document outline.
    pub fn with_outline(mut self, outline: Vec<OutlineSection>) -> Self {
        self.outline = outline;
        self
    }

    /// Cap the number of sub-questions (at least one).
    pub fn with_max_sub_questions(mut self, max: usize) -> Self {
        self.max_sub_questions = max.max(1);
        self
    }

    /// Decompose `question`.
    ///
    /// LLM transport failures propagate. An unparseable or empty reply falls
    /// back to the question itself, so retrieval always has something to run.
    pub async fn decompose(&self, question: &str) -> Result<QueryDecomposition> {
        let request = CompletionRequest::prompt(decomposition_prompt(
            question,
            &self.outline,
            self.max_sub_questions,
        ))
        .with_system_prompt(DECOMPOSITION_SYSTEM_PROMPT)
        .with_temperature(0.0)
        .with_max_tokens(self.max_tokens);

        let response = self.llm.complete(request).await?;

        let mut sub_questions = match parse_sub_questions(&response.content) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("{}: unparseable decomposition ({e}); using the question as-is", self.llm.name());
                Vec::new()
            }
        };
        sub_questions.retain(|q| !q.sub_question.trim().is_empty());
        sub_questions.truncate(self.max_sub_questions);

        if sub_questions.is_empty() {
            return Ok(QueryDecomposition::identity(question));
        }

        log::debug!("Decomposed question into {} sub-questions", sub_questions.len());
        Ok(QueryDecomposition {
            original_question: question.to_string(),
            decomposed_questions: sub_questions,
        })
    }
}

/// Parse an LLM reply into sub-questions.
///
/// Accepts a bare JSON array of sub-questions or an object with a
/// `decomposed_questions` array, optionally inside a fenced code block.
pub fn parse_sub_questions(reply: &str) -> Result<Vec<SubQuestion>> {
    let value: Value = serde_json::from_str(strip_fences(reply))?;
    let list = match value {
        Value::Object(mut obj) => obj.remove("decomposed_questions").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    Ok(serde_json::from_value(list)?)
}

fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

// ============================================================================
// Tests
// ============================================================================
