//! LLM provider abstractions and implementations.

mod claude;
mod mock;
mod provider;

pub use claude::{ClaudeProvider, DEFAULT_CLAUDE_BASE_URL, DEFAULT_CLAUDE_MODEL};
pub use mock::MockLlmProvider;
pub use provider::{
    CompletionRequest, CompletionResponse, LlmProvider, StopReason, TokenUsage,
};
