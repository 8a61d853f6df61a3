//! Retrieval strategies.
//!
//! A strategy turns a [`RetrievalRequest`] into a [`RankedList`] using an
//! embedding provider and a vector search client. Strategies hold no mutable
//! state; one instance serves any number of concurrent requests.

mod hybrid;
mod multi_resolution;
mod token_only;
mod weighted;

pub use hybrid::HybridStrategy;
pub use multi_resolution::MultiResolutionStrategy;
pub use token_only::TokenOnlyStrategy;
pub use weighted::WeightedFusionStrategy;

use async_trait::async_trait;
use std::sync::Arc;

use gigo_core::{Error, Result};

use crate::client::VectorSearchClient;
use crate::config::{RetrievalConfig, StrategyKind};
use crate::embedding::EmbeddingProvider;
use crate::fusion::FusionEngine;
use crate::types::{RankedList, RetrievalRequest};

/// A retrieval strategy.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Strategy name for diagnostics and error context.
    fn name(&self) -> &str;

    /// Run the strategy on an already validated request.
    ///
    /// Errors are returned without retrieval context; callers normally use
    /// [`retrieve`](Self::retrieve).
    async fn run(&self, request: &RetrievalRequest) -> Result<RankedList>;

    /// Check, without any external call, that the strategy's collaborators
    /// can serve it (e.g. every embedding kind it needs is available).
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Validate the request, preflight the strategy, run it, and attach the
    /// strategy name, collection and query to any run failure.
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RankedList> {
        request.validate()?;
        self.preflight()?;
        log::debug!(
            "Retrieving with '{}' from '{}' (limit {}, prefetch {})",
            self.name(),
            request.collection_name,
            request.limit,
            request.prefetch_limit
        );
        let results = self.run(request).await.map_err(|e| {
            Error::retrieval(
                self.name(),
                request.collection_name.clone(),
                request.query.clone(),
                e,
            )
        })?;
        log::debug!("'{}' returned {} candidates", self.name(), results.len());
        Ok(results)
    }
}

/// Builds strategies over a shared embedder and search client.
#[derive(Clone)]
pub struct StrategyFactory {
    embedder: Arc<dyn EmbeddingProvider>,
    client: Arc<dyn VectorSearchClient>,
    fusion: FusionEngine,
}

impl StrategyFactory {
    /// Create a factory with the default fusion engine.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, client: Arc<dyn VectorSearchClient>) -> Self {
        Self {
            embedder,
            client,
            fusion: FusionEngine::default(),
        }
    }

    /// Use a specific fusion engine.
    pub fn with_fusion(mut self, fusion: FusionEngine) -> Self {
        self.fusion = fusion;
        self
    }

    /// Build a non-fusion strategy.
    pub fn build(&self, kind: StrategyKind) -> Result<Arc<dyn RetrievalStrategy>> {
        let strategy: Arc<dyn RetrievalStrategy> = match kind {
            StrategyKind::Hybrid => Arc::new(HybridStrategy::new(
                self.embedder.clone(),
                self.client.clone(),
                self.fusion,
            )),
            StrategyKind::TokenOnly => Arc::new(TokenOnlyStrategy::new(
                self.embedder.clone(),
                self.client.clone(),
            )),
            StrategyKind::MultiResolution => Arc::new(MultiResolutionStrategy::new(
                self.embedder.clone(),
                self.client.clone(),
                self.fusion,
            )),
            StrategyKind::WeightedFusion => {
                return Err(Error::config(
                    "weighted_fusion requires constituent weights; use build_weighted",
                ));
            }
        };
        Ok(strategy)
    }

    /// Build a weighted fusion over the given constituents.
    pub fn build_weighted(&self, weights: &[(StrategyKind, f32)]) -> Result<Arc<dyn RetrievalStrategy>> {
        let constituents = weights
            .iter()
            .map(|(kind, weight)| Ok((self.build(*kind)?, *weight)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(WeightedFusionStrategy::new(constituents, self.fusion)?))
    }

    /// Build the strategy selected by a retrieval config, using its RRF
    /// constant.
    pub fn from_config(&self, config: &RetrievalConfig) -> Result<Arc<dyn RetrievalStrategy>> {
        if config.rrf_k == 0 {
            return Err(Error::config("rrf_k must be at least 1"));
        }
        let factory = self.clone().with_fusion(self.fusion.with_rrf_k(config.rrf_k));
        match config.strategy_kind()? {
            StrategyKind::WeightedFusion => factory.build_weighted(&config.parsed_fusion_weights()?),
            kind => factory.build(kind),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
