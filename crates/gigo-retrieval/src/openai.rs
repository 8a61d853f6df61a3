//! OpenAI embeddings provider for the multi-resolution pair.
//!
//! The small and large embeddings come from the same model family truncated
//! to different dimensions, so a wide cheap prefetch in the small space can
//! be rescored precisely in the large space.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use gigo_core::{Error, Result};

use crate::embedding::EmbeddingProvider;
use crate::types::{EmbeddingKind, QueryVector};

/// Default API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// A model name and output dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionModel {
    /// Model identifier.
    pub model: String,
    /// Requested embedding dimension.
    pub dimensions: usize,
}

impl ResolutionModel {
    /// Create a model spec.
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }

    /// Default small resolution: `text-embedding-3-small` at 128 dimensions.
    pub fn default_small() -> Self {
        Self::new("text-embedding-3-small", 128)
    }

    /// Default large resolution: `text-embedding-3-large` at 1024 dimensions.
    pub fn default_large() -> Self {
        Self::new("text-embedding-3-large", 1024)
    }
}

/// Embedding provider backed by the OpenAI embeddings endpoint.
///
/// Supports only [`EmbeddingKind::Small`] and [`EmbeddingKind::Large`].
pub struct OpenAiEmbeddingProvider {
    api_key: String,
    base_url: String,
    small: ResolutionModel,
    large: ResolutionModel,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    /// Creates a provider with default models and base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            small: ResolutionModel::default_small(),
            large: ResolutionModel::default_large(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the small and large models.
    pub fn with_models(mut self, small: ResolutionModel, large: ResolutionModel) -> Self {
        self.small = small;
        self.large = large;
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

    fn model_for(&self, kind: EmbeddingKind) -> Result<&ResolutionModel> {
        match kind {
            EmbeddingKind::Small => Ok(&self.small),
            EmbeddingKind::Large => Ok(&self.large),
            other => Err(Error::config(format!(
                "openai provider cannot produce {other} embeddings"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str, kind: EmbeddingKind) -> Result<QueryVector> {
        let spec = self.model_for(kind)?;
        let flattened = text.replace('\n', " ");
        let body = EmbeddingsRequest {
            input: vec![flattened.as_str()],
            model: &spec.model,
            dimensions: spec.dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external("openai", format!("Failed to call embeddings API: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::external(
                "openai",
                format!("Embeddings API error {status}: {error_text}"),
            ));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::external("openai", format!("Failed to parse response: {e}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::external("openai", "Empty embeddings response"))?;

        if embedding.len() != spec.dimensions {
            log::warn!(
                "openai returned {} dimensions for {}, expected {}",
                embedding.len(),
                spec.model,
                spec.dimensions
            );
        }

        Ok(QueryVector::Dense(embedding))
    }

    fn supports(&self, kind: EmbeddingKind) -> bool {
        matches!(kind, EmbeddingKind::Small | EmbeddingKind::Large)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_construction() {
        let provider = OpenAiEmbeddingProvider::new("test-key").with_base_url("http://localhost:9/v1/");
        assert_eq!(provider.api_key, "test-key");
        assert_eq!(provider.base_url, "http://localhost:9/v1");
        assert_eq!(provider.small, ResolutionModel::default_small());
        assert_eq!(provider.large.dimensions, 1024);
    }

    #[test]
    fn test_openai_supports_only_resolution_pair() {
        let provider = OpenAiEmbeddingProvider::new("k");
        assert!(provider.supports(EmbeddingKind::Small));
        assert!(provider.supports(EmbeddingKind::Large));
        assert!(!provider.supports(EmbeddingKind::Dense));
        assert!(!provider.supports(EmbeddingKind::Token));
    }

    #[tokio::test]
    async fn test_openai_unsupported_kind_fails_before_request() {
        let provider = OpenAiEmbeddingProvider::new("k").with_base_url("http://127.0.0.1:1");
        let err = provider.embed("q", EmbeddingKind::Sparse).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_request_body_shape() {
        let body = EmbeddingsRequest {
            input: vec!["oil capacity"],
            model: "text-embedding-3-small",
            dimensions: 128,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["dimensions"], 128);
        assert_eq!(json["input"][0], "oil capacity");
    }

    #[tokio::test]
    #[ignore]
    #[allow(clippy::expect_used)]
    async fn test_openai_provider_integration() {
        let api_key = std::env::var("OPENAI_API_KEY")
            .expect("OPENAI_API_KEY must be set for integration tests");
        let provider = OpenAiEmbeddingProvider::new(api_key);
        let QueryVector::Dense(v) = provider.embed("hello", EmbeddingKind::Small).await.unwrap()
        else {
            panic!("expected dense vector");
        };
        assert_eq!(v.len(), 128);
    }
}
