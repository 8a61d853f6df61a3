//! Weighted fusion over other strategies.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

use gigo_core::{Error, Result};

use super::RetrievalStrategy;
use crate::fusion::FusionEngine;
use crate::types::{RankedList, RetrievalRequest};

/// Runs every constituent strategy concurrently on the same request and
/// merges their outputs by weighted sum of min-max normalized scores.
///
/// Each constituent decides whether the score threshold applies on its own
/// scale; the fused scores are not thresholded again. All constituents are
/// preflighted before any of them runs.
pub struct WeightedFusionStrategy {
    constituents: Vec<(Arc<dyn RetrievalStrategy>, f32)>,
    fusion: FusionEngine,
}

impl std::fmt::Debug for WeightedFusionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedFusionStrategy")
            .field(
                "constituents",
                &self
                    .constituents
                    .iter()
                    .map(|(s, w)| (s.name().to_string(), *w))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl WeightedFusionStrategy {
    /// Create a weighted fusion.
    ///
    /// Requires at least two constituents with finite, non-negative weights.
    pub fn new(
        constituents: Vec<(Arc<dyn RetrievalStrategy>, f32)>,
        fusion: FusionEngine,
    ) -> Result<Self> {
        if constituents.len() < 2 {
            return Err(Error::config(format!(
                "weighted_fusion needs at least 2 constituents, got {}",
                constituents.len()
            )));
        }
        if let Some((strategy, weight)) = constituents
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(Error::config(format!(
                "Fusion weight for '{}' must be finite and >= 0, got {weight}",
                strategy.name()
            )));
        }
        Ok(Self {
            constituents,
            fusion,
        })
    }
}

#[async_trait]
impl RetrievalStrategy for WeightedFusionStrategy {
    fn name(&self) -> &str {
        "weighted_fusion"
    }

    fn preflight(&self) -> Result<()> {
        self.constituents
            .iter()
            .try_for_each(|(strategy, _)| strategy.preflight())
    }

    async fn run(&self, request: &RetrievalRequest) -> Result<RankedList> {
        // Every constituent must be runnable before any of them starts.
        self.preflight()?;

        let runs = self.constituents.iter().map(|(strategy, weight)| async move {
            let list = strategy.run(request).await.map_err(|e| {
                Error::retrieval(
                    strategy.name(),
                    request.collection_name.clone(),
                    request.query.clone(),
                    e,
                )
            })?;
            Ok::<_, Error>((*weight, list))
        });
        let lists = try_join_all(runs).await?;

        for ((strategy, _), (_, list)) in self.constituents.iter().zip(&lists) {
            log::debug!("weighted_fusion: '{}' contributed {}", strategy.name(), list.len());
        }

        Ok(self.fusion.weighted_merge(&lists, request.limit))
    }
}
