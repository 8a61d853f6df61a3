//! Retrieval configuration and strategy selection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use gigo_core::{Error, Result};

use crate::fusion::DEFAULT_RRF_K;
use crate::types::{
    DEFAULT_LIMIT, DEFAULT_PREFETCH_LIMIT, DEFAULT_SCORE_THRESHOLD, RetrievalRequest,
};

/// The available retrieval strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Dense + sparse prefetch fused by RRF, reranked by token embeddings.
    Hybrid,
    /// Token-level search alone.
    TokenOnly,
    /// Small-embedding prefetch reranked by large embeddings.
    MultiResolution,
    /// Weighted sum of normalized constituent strategy scores.
    WeightedFusion,
}

impl StrategyKind {
    /// All strategies, in declaration order.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Hybrid,
        StrategyKind::TokenOnly,
        StrategyKind::MultiResolution,
        StrategyKind::WeightedFusion,
    ];

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::TokenOnly => "token_only",
            Self::MultiResolution => "multi_resolution",
            Self::WeightedFusion => "weighted_fusion",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "token_only" | "colbert" => Ok(Self::TokenOnly),
            "multi_resolution" | "matryoshka" => Ok(Self::MultiResolution),
            "weighted_fusion" | "fusion" => Ok(Self::WeightedFusion),
            other => Err(Error::config(format!(
                "Unknown retrieval strategy: '{other}'. Supported: hybrid, token_only, multi_resolution, weighted_fusion"
            ))),
        }
    }
}

/// Configuration for retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Collection to search.
    #[serde(default = "default_collection")]
    pub collection_name: String,

    /// Strategy name (see [`StrategyKind`]).
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Results per (sub-)question.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Prefetch width.
    #[serde(default = "default_prefetch_limit")]
    pub prefetch_limit: usize,

    /// Minimum reranked score.
    #[serde(default = "default_threshold")]
    pub score_threshold: Option<f32>,

    /// RRF constant.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    /// Constituent weights for weighted fusion, keyed by strategy name.
    #[serde(default = "default_fusion_weights")]
    pub fusion_weights: BTreeMap<String, f32>,
}

fn default_collection() -> String {
    "hybrid_collection".to_string()
}

fn default_strategy() -> String {
    StrategyKind::Hybrid.as_str().to_string()
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_prefetch_limit() -> usize {
    DEFAULT_PREFETCH_LIMIT
}

fn default_threshold() -> Option<f32> {
    Some(DEFAULT_SCORE_THRESHOLD)
}

fn default_rrf_k() -> u32 {
    DEFAULT_RRF_K
}

fn default_fusion_weights() -> BTreeMap<String, f32> {
    BTreeMap::from([
        (StrategyKind::Hybrid.as_str().to_string(), 0.5),
        (StrategyKind::MultiResolution.as_str().to_string(), 0.5),
    ])
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection_name: default_collection(),
            strategy: default_strategy(),
            limit: default_limit(),
            prefetch_limit: default_prefetch_limit(),
            score_threshold: default_threshold(),
            rrf_k: default_rrf_k(),
            fusion_weights: default_fusion_weights(),
        }
    }
}

impl RetrievalConfig {
    /// Parse the configured strategy name.
    pub fn strategy_kind(&self) -> Result<StrategyKind> {
        self.strategy.parse()
    }

    /// Parse and validate the fusion weights.
    ///
    /// Every weight must be finite and non-negative, names must be
    /// non-fusion strategies, and at least two constituents are required.
    pub fn parsed_fusion_weights(&self) -> Result<Vec<(StrategyKind, f32)>> {
        let mut parsed = Vec::with_capacity(self.fusion_weights.len());
        for (name, weight) in &self.fusion_weights {
            let kind: StrategyKind = name.parse()?;
            if kind == StrategyKind::WeightedFusion {
                return Err(Error::config(
                    "weighted_fusion cannot be a constituent of itself",
                ));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::config(format!(
                    "Fusion weight for '{name}' must be finite and >= 0, got {weight}"
                )));
            }
            if parsed.iter().any(|(k, _)| *k == kind) {
                return Err(Error::config(format!("Duplicate fusion constituent: '{name}'")));
            }
            parsed.push((kind, *weight));
        }
        if parsed.len() < 2 {
            return Err(Error::config(format!(
                "weighted_fusion needs at least 2 constituents, got {}",
                parsed.len()
            )));
        }
        Ok(parsed)
    }

    /// A retrieval request for `query` using these settings.
    pub fn request(&self, query: impl Into<String>) -> RetrievalRequest {
        RetrievalRequest::new(query, self.collection_name.clone())
            .with_limit(self.limit)
            .with_prefetch_limit(self.prefetch_limit)
            .with_threshold(self.score_threshold)
    }
}

// ============================================================================
// Tests
// ============================================================================
