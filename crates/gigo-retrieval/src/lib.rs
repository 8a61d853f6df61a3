//! Retrieval strategies and rank fusion for Gigo.
//!
//! This crate turns a question into a ranked list of candidate records by
//! combining searches in several embedding spaces of a vector collection.
//! It provides pluggable embedding providers and search clients, plus
//! in-memory implementations for testing.
//!
//! # Features
//!
//! - `fastembed`: Enable local dense/sparse embedding generation via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     gigo-retrieval                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RetrievalStrategy trait (StrategyFactory)                  │
//! │  ├── HybridStrategy (dense+sparse RRF → token rerank)       │
//! │  ├── TokenOnlyStrategy                                      │
//! │  ├── MultiResolutionStrategy (small → large rerank)         │
//! │  └── WeightedFusionStrategy (normalized weighted sum)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FusionEngine (RRF, prefetch-then-rerank, weighted merge)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                                    │
//! │  ├── MockEmbeddingProvider / RoutingEmbeddingProvider       │
//! │  ├── OpenAiEmbeddingProvider (small/large)                  │
//! │  └── FastEmbedProvider (feature: fastembed)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VectorSearchClient trait                                   │
//! │  ├── InMemorySearchClient / StaticSearchClient              │
//! │  └── QdrantSearchClient                                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use gigo_retrieval::{
//!     MockEmbeddingProvider, RetrievalRequest, StrategyFactory, StrategyKind,
//!     QdrantSearchClient,
//! };
//! use std::sync::Arc;
//!
//! let factory = StrategyFactory::new(
//!     Arc::new(MockEmbeddingProvider::new(384)),
//!     Arc::new(QdrantSearchClient::new("http://localhost:6333")),
//! );
//! let strategy = factory.build(StrategyKind::Hybrid)?;
//!
//! let request = RetrievalRequest::new("engine oil capacity", "service_manual")
//!     .with_limit(5);
//!
//! for record in strategy.retrieve(&request).await? {
//!     println!("{}: {:.3}", record.id, record.score);
//! }
//! ```

// Core modules (always available)
pub mod client;
pub mod config;
pub mod embedding;
pub mod fusion;
pub mod types;

// Strategies
pub mod strategy;

// Remote backends
pub mod openai;
pub mod qdrant;

// Feature-gated backend modules
#[cfg(feature = "fastembed")]
pub mod fastembed;

// Re-exports: core types
pub use types::{
    CandidateRecord, EmbeddingKind, Payload, QueryVector, RankedList, RetrievalRequest,
    SearchFilter, SearchRequest, SparseVector,
};

// Re-exports: configuration
pub use config::{RetrievalConfig, StrategyKind};

// Re-exports: traits
pub use client::{InMemorySearchClient, StaticSearchClient, StoredPoint, VectorSearchClient};
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider, RoutingEmbeddingProvider};

// Re-exports: fusion and strategies
pub use fusion::{FusionEngine, min_max_normalize};
pub use strategy::{
    HybridStrategy, MultiResolutionStrategy, RetrievalStrategy, StrategyFactory,
    TokenOnlyStrategy, WeightedFusionStrategy,
};

// Re-exports: remote backends
pub use openai::{OpenAiEmbeddingProvider, ResolutionModel};
pub use qdrant::QdrantSearchClient;

// Feature-gated re-exports
#[cfg(feature = "fastembed")]
pub use crate::fastembed::FastEmbedProvider;
