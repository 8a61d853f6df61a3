//! Token-level (late-interaction) retrieval alone.

use async_trait::async_trait;
use std::sync::Arc;

use gigo_core::Result;

use super::RetrievalStrategy;
use crate::client::VectorSearchClient;
use crate::embedding::{EmbeddingProvider, ensure_supported};
use crate::types::{EmbeddingKind, RankedList, RetrievalRequest, SearchRequest};

/// A single token-level search at `limit`, cut at the score threshold.
pub struct TokenOnlyStrategy {
    embedder: Arc<dyn EmbeddingProvider>,
    client: Arc<dyn VectorSearchClient>,
}

impl TokenOnlyStrategy {
    /// Create a token-only strategy.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, client: Arc<dyn VectorSearchClient>) -> Self {
        Self { embedder, client }
    }
}

#[async_trait]
impl RetrievalStrategy for TokenOnlyStrategy {
    fn name(&self) -> &str {
        "token_only"
    }

    fn preflight(&self) -> Result<()> {
        ensure_supported(self.embedder.as_ref(), &[EmbeddingKind::Token])
    }

    async fn run(&self, request: &RetrievalRequest) -> Result<RankedList> {
        self.preflight()?;

        let token = self
            .embedder
            .embed(&request.query, EmbeddingKind::Token)
            .await?;

        let hits = self
            .client
            .search(SearchRequest::new(
                request.collection_name.clone(),
                EmbeddingKind::Token,
                token,
                request.limit,
            ))
            .await?;

        Ok(hits.at_least(request.score_threshold).truncated(request.limit))
    }
}
