//! Claude API provider implementation.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use gigo_core::{Error, Result};

use super::provider::{CompletionRequest, CompletionResponse, LlmProvider, StopReason, TokenUsage};

/// Default Messages API base URL.
pub const DEFAULT_CLAUDE_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Default model identifier.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";

const SERVICE: &str = "claude";
const API_VERSION: &str = "2023-06-01";

/// LLM provider using Anthropic's Claude API.
pub struct ClaudeProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl ClaudeProvider {
    /// Creates a new Claude provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key
    /// * `model` - Model ID (e.g., "claude-sonnet-4-20250514")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_CLAUDE_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    /// The configured model.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        if let Some(system) = request.system_prompt {
            body["system"] = json!(system);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        body
    }
}

/// Parse a Messages API response body.
fn parse_response(body: &Value) -> Result<CompletionResponse> {
    // Concatenate every text block; tool or thinking blocks are ignored.
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| Error::external(SERVICE, "Missing content in Claude response"))?;
    let content: String = blocks
        .iter()
        .filter(|b| b["type"].as_str().is_none_or(|t| t == "text"))
        .filter_map(|b| b["text"].as_str())
        .collect();

    let usage = &body["usage"];
    let tokens_used = TokenUsage {
        input: usage["input_tokens"].as_u64().unwrap_or(0),
        output: usage["output_tokens"].as_u64().unwrap_or(0),
    };

    let stop_reason = body["stop_reason"]
        .as_str()
        .map(StopReason::from_wire)
        .ok_or_else(|| Error::external(SERVICE, "Missing stop_reason"))?;

    Ok(CompletionResponse {
        content,
        tokens_used,
        stop_reason,
    })
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.request_body(request);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Failed to call Claude API: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::external(
                SERVICE,
                format!("Claude API error {status}: {error_text}"),
            ));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Failed to parse Claude response: {e}")))?;

        let parsed = parse_response(&response_body)?;
        log::debug!(
            "claude completion: {} tokens ({:?})",
            parsed.tokens_used.total(),
            parsed.stop_reason
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}
