//! Hybrid retrieval: dense + sparse prefetch, token-level rerank.

use async_trait::async_trait;
use std::sync::Arc;

use gigo_core::Result;

use super::RetrievalStrategy;
use crate::client::VectorSearchClient;
use crate::embedding::{EmbeddingProvider, ensure_supported};
use crate::fusion::FusionEngine;
use crate::types::{EmbeddingKind, RankedList, RetrievalRequest, SearchFilter, SearchRequest};

const REQUIRED: [EmbeddingKind; 3] = [
    EmbeddingKind::Dense,
    EmbeddingKind::Sparse,
    EmbeddingKind::Token,
];

/// Dense and sparse searches at `prefetch_limit` are fused by RRF into a
/// prefetch set, which a token-level search then rescores. Records below the
/// score threshold are dropped and at most `limit` are returned.
pub struct HybridStrategy {
    embedder: Arc<dyn EmbeddingProvider>,
    client: Arc<dyn VectorSearchClient>,
    fusion: FusionEngine,
}

impl HybridStrategy {
    /// Create a hybrid strategy.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        client: Arc<dyn VectorSearchClient>,
        fusion: FusionEngine,
    ) -> Self {
        Self {
            embedder,
            client,
            fusion,
        }
    }
}

#[async_trait]
impl RetrievalStrategy for HybridStrategy {
    fn name(&self) -> &str {
        "hybrid"
    }

    fn preflight(&self) -> Result<()> {
        ensure_supported(self.embedder.as_ref(), &REQUIRED)
    }

    async fn run(&self, request: &RetrievalRequest) -> Result<RankedList> {
        self.preflight()?;

        let (dense, sparse, token) = futures::try_join!(
            self.embedder.embed(&request.query, EmbeddingKind::Dense),
            self.embedder.embed(&request.query, EmbeddingKind::Sparse),
            self.embedder.embed(&request.query, EmbeddingKind::Token),
        )?;

        let collection = &request.collection_name;
        let (dense_hits, sparse_hits) = futures::try_join!(
            self.client.search(SearchRequest::new(
                collection.clone(),
                EmbeddingKind::Dense,
                dense,
                request.prefetch_limit,
            )),
            self.client.search(SearchRequest::new(
                collection.clone(),
                EmbeddingKind::Sparse,
                sparse,
                request.prefetch_limit,
            )),
        )?;

        let prefetch = self
            .fusion
            .reciprocal_rank_fusion(&[dense_hits, sparse_hits], request.prefetch_limit);
        if prefetch.is_empty() {
            log::debug!("hybrid prefetch returned no candidates");
            return Ok(RankedList::empty());
        }

        let rescored = self
            .client
            .search(
                SearchRequest::new(collection.clone(), EmbeddingKind::Token, token, prefetch.len())
                    .with_filter(SearchFilter::only(&prefetch)),
            )
            .await?;

        Ok(self.fusion.prefetch_then_rerank(
            &prefetch,
            &rescored,
            request.limit,
            request.score_threshold,
        ))
    }
}
