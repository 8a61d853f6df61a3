//! Multi-resolution retrieval: small-embedding prefetch, large-embedding rerank.

use async_trait::async_trait;
use std::sync::Arc;

use gigo_core::Result;

use super::RetrievalStrategy;
use crate::client::VectorSearchClient;
use crate::embedding::{EmbeddingProvider, ensure_supported};
use crate::fusion::FusionEngine;
use crate::types::{EmbeddingKind, RankedList, RetrievalRequest, SearchFilter, SearchRequest};

/// A search in the small embedding space at `prefetch_limit`, rescored in
/// the large space and cut at `limit`.
///
/// Scores are cosine similarities, so the request's score threshold (set
/// for token-level scores) is not applied.
pub struct MultiResolutionStrategy {
    embedder: Arc<dyn EmbeddingProvider>,
    client: Arc<dyn VectorSearchClient>,
    fusion: FusionEngine,
}

impl MultiResolutionStrategy {
    /// Create a multi-resolution strategy.
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
impl RetrievalStrategy for MultiResolutionStrategy {
    fn name(&self) -> &str {
        "multi_resolution"
    }

    fn preflight(&self) -> Result<()> {
        ensure_supported(
            self.embedder.as_ref(),
            &[EmbeddingKind::Small, EmbeddingKind::Large],
        )
    }

    async fn run(&self, request: &RetrievalRequest) -> Result<RankedList> {
        self.preflight()?;

        let (small, large) = futures::try_join!(
            self.embedder.embed(&request.query, EmbeddingKind::Small),
            self.embedder.embed(&request.query, EmbeddingKind::Large),
        )?;

        let prefetch = self
            .client
            .search(SearchRequest::new(
                request.collection_name.clone(),
                EmbeddingKind::Small,
                small,
                request.prefetch_limit,
            ))
            .await?;
        if prefetch.is_empty() {
            return Ok(RankedList::empty());
        }

        let rescored = self
            .client
            .search(
                SearchRequest::new(
                    request.collection_name.clone(),
                    EmbeddingKind::Large,
                    large,
                    prefetch.len(),
                )
                .with_filter(SearchFilter::only(&prefetch)),
            )
            .await?;

        Ok(self.fusion.prefetch_then_rerank(
            &prefetch,
            &rescored,
            request.limit,
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemorySearchClient, StaticSearchClient, StoredPoint};
    use crate::embedding::{MockEmbeddingProvider, RoutingEmbeddingProvider};
    use crate::types::{CandidateRecord, QueryVector};
    use serde_json::json;

    #[tokio::test]
    async fn test_multi_resolution_rescoring_reorders() {
        let client = Arc::new(
            StaticSearchClient::new()
                .with_results(
                    EmbeddingKind::Small,
                    vec![
                        CandidateRecord::new("a", 0.9),
                        CandidateRecord::new("b", 0.8),
                        CandidateRecord::new("c", 0.7),
                    ],
                )
                .with_results(
                    EmbeddingKind::Large,
                    vec![
                        CandidateRecord::new("c", 0.95),
                        CandidateRecord::new("a", 0.6),
                        CandidateRecord::new("b", 0.1),
                    ],
                ),
        );
        let strategy = MultiResolutionStrategy::new(
            Arc::new(MockEmbeddingProvider::new(8)),
            client.clone(),
            FusionEngine::default(),
        );

        let request = RetrievalRequest::new("q", "manual")
            .with_limit(2)
            .with_prefetch_limit(3);
        let results = strategy.retrieve(&request).await.unwrap();

        assert_eq!(results.ids(), vec!["c", "a"]);
        let requests = client.requests();
        assert_eq!(requests[0].kind, EmbeddingKind::Small);
        assert_eq!(requests[0].limit, 3);
        assert_eq!(requests[1].kind, EmbeddingKind::Large);
        assert!(requests[1].filter.is_some());
    }

    #[tokio::test]
    async fn test_multi_resolution_in_memory() {
        let client = InMemorySearchClient::new()
            .with_point(
                "manual",
                StoredPoint::new("near", json!({"page_number": 1}))
                    .with_vector(EmbeddingKind::Small, QueryVector::Dense(vec![1.0, 0.0]))
                    .with_vector(EmbeddingKind::Large, QueryVector::Dense(vec![0.0, 1.0, 0.0])),
            )
            .with_point(
                "manual",
                StoredPoint::new("far", json!({"page_number": 2}))
                    .with_vector(EmbeddingKind::Small, QueryVector::Dense(vec![0.0, 1.0]))
                    .with_vector(EmbeddingKind::Large, QueryVector::Dense(vec![1.0, 0.0, 0.0])),
            );

        struct Fixed;

        #[async_trait]
        impl EmbeddingProvider for Fixed {
            async fn embed(&self, _text: &str, kind: EmbeddingKind) -> Result<QueryVector> {
                Ok(match kind {
                    EmbeddingKind::Small => QueryVector::Dense(vec![1.0, 0.0]),
                    _ => QueryVector::Dense(vec![1.0, 0.0, 0.0]),
                })
            }
            fn supports(&self, _kind: EmbeddingKind) -> bool {
                true
            }
            fn name(&self) -> &str {
                "fixed"
            }
        }

        let strategy =
            MultiResolutionStrategy::new(Arc::new(Fixed), Arc::new(client), FusionEngine::default());
        let request = RetrievalRequest::new("q", "manual").with_threshold(None);
        let results = strategy.retrieve(&request).await.unwrap();

        // Large space reverses the small-space ranking.
        assert_eq!(results.ids(), vec!["far", "near"]);
    }

    #[tokio::test]
    async fn test_multi_resolution_ignores_token_scale_threshold() {
        let client = Arc::new(
            StaticSearchClient::new()
                .with_results(
                    EmbeddingKind::Small,
                    vec![CandidateRecord::new("p45", 0.82), CandidateRecord::new("p236", 0.64)],
                )
                .with_results(
                    EmbeddingKind::Large,
                    vec![CandidateRecord::new("p45", 0.91), CandidateRecord::new("p236", 0.55)],
                ),
        );
        let strategy = MultiResolutionStrategy::new(
            Arc::new(MockEmbeddingProvider::new(8)),
            client,
            FusionEngine::default(),
        );

        let request = crate::config::RetrievalConfig::default().request("oil capacity");
        assert_eq!(request.score_threshold, Some(5.0));
        let results = strategy.retrieve(&request).await.unwrap();

        assert_eq!(results.ids(), vec!["p45", "p236"]);
        assert!((results.records()[0].score - 0.91).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_multi_resolution_requires_both_resolutions() {
        let embedder = RoutingEmbeddingProvider::new()
            .with_route(EmbeddingKind::Small, Arc::new(MockEmbeddingProvider::new(8)));
        let client = Arc::new(StaticSearchClient::new());
        let strategy =
            MultiResolutionStrategy::new(Arc::new(embedder), client.clone(), FusionEngine::default());

        let err = strategy
            .retrieve(&RetrievalRequest::new("q", "manual"))
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(client.requests().is_empty());
    }
}
