//! Gigo Service: question answering on top of retrieval and references.
//!
//! ```text
//!   question ──► QueryDecomposer ──► sub-questions
//!                                      │  (concurrently)
//!                                      ▼
//!                         RetrievalStrategy::retrieve ──► RankedList per sub-question
//!                                      │
//!                                      ▼
//!                         ReferenceResolver ──► tables / figures + files
//!                                      │
//!                                      ▼
//!                         AnswerSynthesizer ──► Answer { answer, references }
//! ```
//!
//! # Modules
//!
//! - [`llm`]: chat-completion providers (Claude over HTTP, a mock for tests)
//! - [`decompose`]: LLM-driven query decomposition
//! - [`evidence`]: concurrent per-sub-question retrieval and reference resolution
//! - [`answer`]: answer synthesis
//! - [`prompts`]: prompt templates

pub mod answer;
pub mod decompose;
pub mod evidence;
pub mod llm;
pub mod prompts;

pub use answer::{Answer, AnswerSynthesizer, QuestionAnswerer};
pub use decompose::{QueryDecomposer, QueryDecomposition, SubQuestion};
pub use evidence::{Evidence, EvidenceService, SubQuestionEvidence};
pub use llm::{ClaudeProvider, LlmProvider, MockLlmProvider};
pub use prompts::OutlineSection;
