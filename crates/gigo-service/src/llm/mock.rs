//! Mock LLM provider for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use gigo_core::{Error, Result};

use super::provider::{CompletionRequest, CompletionResponse, LlmProvider, StopReason, TokenUsage};

/// Mock LLM provider that returns canned responses and records requests.
///
/// Useful for testing without making actual API calls.
#[derive(Clone, Default)]
pub struct MockLlmProvider {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    canned: Vec<String>,
    index: usize,
    requests: Vec<CompletionRequest>,
}

impl MockLlmProvider {
    /// Creates a new mock provider with canned responses.
    ///
    /// Responses are returned in order. After all responses are used,
    /// the provider cycles back to the first response. A provider with no
    /// responses fails every call with an external-service error.
    ///
    /// # Examples
    ///
    /// ```
    /// use gigo_service::llm::MockLlmProvider;
    ///
    /// let provider = MockLlmProvider::new(vec![
    ///     "First response".to_string(),
    ///     "Second response".to_string(),
    /// ]);
    /// ```
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                canned: responses,
                ..MockState::default()
            })),
        }
    }

    /// Creates a mock provider with a single response.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut state = self.state.lock().await;
        state.requests.push(request);

        if state.canned.is_empty() {
            return Err(Error::external("mock-llm", "no canned responses configured"));
        }

        let content = state.canned[state.index].clone();
        state.index = (state.index + 1) % state.canned.len();

        Ok(CompletionResponse {
            content,
            tokens_used: TokenUsage {
                input: 10,
                output: 20,
            },
            stop_reason: StopReason::EndTurn,
        })
    }

    fn name(&self) -> &str {
        "mock-llm"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_single_response() {
        let provider = MockLlmProvider::with_response("Test response");

        let response = provider
            .complete(CompletionRequest::prompt("Hello"))
            .await
            .unwrap();
        assert_eq!(response.content, "Test response");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
    }

    #[tokio::test]
    async fn test_mock_provider_cycles() {
        let provider = MockLlmProvider::new(vec!["First".to_string(), "Second".to_string()]);
        let request = CompletionRequest::prompt("Test");

        assert_eq!(provider.complete(request.clone()).await.unwrap().content, "First");
        assert_eq!(provider.complete(request.clone()).await.unwrap().content, "Second");
        assert_eq!(provider.complete(request).await.unwrap().content, "First");
    }

    #[tokio::test]
    async fn test_mock_provider_records_requests_across_clones() {
        let provider = MockLlmProvider::with_response("Shared");
        let clone = provider.clone();

        provider.complete(CompletionRequest::prompt("one")).await.unwrap();
        clone.complete(CompletionRequest::prompt("two")).await.unwrap();

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].prompt, "two");
    }

    #[tokio::test]
    async fn test_mock_provider_without_responses() {
        let provider = MockLlmProvider::new(Vec::new());
        let err = provider
            .complete(CompletionRequest::prompt("Hello"))
            .await
            .unwrap_err();
        assert!(err.is_external());
    }
}
