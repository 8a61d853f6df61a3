//! Embedding provider trait and mock implementation.
//!
//! This module defines the `EmbeddingProvider` trait that abstracts over
//! the backends turning query text into vectors in each embedding space
//! (dense, sparse, per-token, and the small/large multi-resolution pair).
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: Deterministic vectors of every kind, for testing
//! - `RoutingEmbeddingProvider`: Dispatches each kind to a configured backend
//! - `OpenAiEmbeddingProvider`: Remote small/large embeddings (see `openai`)
//! - `FastEmbedProvider`: Local dense/sparse embeddings (requires `fastembed` feature)

use async_trait::async_trait;
use gigo_core::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{EmbeddingKind, QueryVector, SparseVector};

/// Trait for generating query embeddings.
///
/// Implementations wrap specific embedding libraries or services and provide
/// a uniform async interface. The trait requires `Send + Sync` so a provider
/// can be shared by concurrently running strategies.
///
/// # Thread Safety
///
/// Implementations should handle internal synchronization (e.g., `Arc<Mutex<>>`)
/// for thread-unsafe underlying libraries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text` in the given embedding space.
    async fn embed(&self, text: &str, kind: EmbeddingKind) -> Result<QueryVector>;

    /// Whether this provider can produce embeddings of `kind`.
    fn supports(&self, kind: EmbeddingKind) -> bool;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Fail with a configuration error unless `provider` supports every kind.
///
/// Strategies call this before issuing any external request.
pub fn ensure_supported(provider: &dyn EmbeddingProvider, kinds: &[EmbeddingKind]) -> Result<()> {
    let missing: Vec<&str> = kinds
        .iter()
        .filter(|k| !provider.supports(**k))
        .map(|k| k.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "Embedding provider '{}' cannot produce: {}",
            provider.name(),
            missing.join(", ")
        )))
    }
}

// ============================================================================
// Mock provider
// ============================================================================

/// A mock embedding provider for testing.
///
/// Generates deterministic vectors based on the input text. Each component is
/// derived from the text bytes, producing consistent embeddings for the same
/// input. Small embeddings use half the configured dimension.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dense dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// The dense dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generate a deterministic unit vector from text.
    fn deterministic_embedding(&self, text: &str, dimension: usize, salt: u8) -> Vec<f32> {
        let mut embedding = vec![0.0f32; dimension];
        let bytes = text.as_bytes();

        for (i, val) in embedding.iter_mut().enumerate() {
            let byte_idx = i % bytes.len().max(1);
            let byte_val = if bytes.is_empty() { 0u8 } else { bytes[byte_idx] };
            *val = ((byte_val.wrapping_add(salt) as f32 + i as f32) % 256.0) / 256.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }

        embedding
    }

    /// One weight per distinct word, indexed by a byte fold of the word.
    fn sparse_embedding(&self, text: &str) -> SparseVector {
        let mut weights: BTreeMap<u32, f32> = BTreeMap::new();
        for word in text.split_whitespace() {
            let index = word
                .to_lowercase()
                .bytes()
                .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
                % 30_000;
            *weights.entry(index).or_insert(0.0) += 1.0;
        }
        SparseVector {
            indices: weights.keys().copied().collect(),
            values: weights.values().copied().collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str, kind: EmbeddingKind) -> Result<QueryVector> {
        let vector = match kind {
            EmbeddingKind::Dense => {
                QueryVector::Dense(self.deterministic_embedding(text, self.dimension, 0))
            }
            EmbeddingKind::Small => QueryVector::Dense(self.deterministic_embedding(
                text,
                (self.dimension / 2).max(1),
                17,
            )),
            EmbeddingKind::Large => {
                QueryVector::Dense(self.deterministic_embedding(text, self.dimension, 29))
            }
            EmbeddingKind::Sparse => QueryVector::Sparse(self.sparse_embedding(text)),
            EmbeddingKind::Token => QueryVector::Multi(
                text.split_whitespace()
                    .map(|token| self.deterministic_embedding(token, self.dimension, 0))
                    .collect(),
            ),
        };
        Ok(vector)
    }

    fn supports(&self, _kind: EmbeddingKind) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Routing provider
// ============================================================================

/// Dispatches each embedding kind to a dedicated provider.
///
/// Deployments typically combine a local model for dense/sparse/token
/// vectors with a remote API for the multi-resolution pair.
#[derive(Default)]
pub struct RoutingEmbeddingProvider {
    routes: BTreeMap<EmbeddingKind, Arc<dyn EmbeddingProvider>>,
}

impl RoutingEmbeddingProvider {
    /// Create a router with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `kind` to `provider`.
    pub fn with_route(mut self, kind: EmbeddingKind, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.routes.insert(kind, provider);
        self
    }

    /// Route every kind `provider` supports to it, unless already routed.
    pub fn with_fallback(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        for kind in EmbeddingKind::ALL {
            if provider.supports(kind) {
                self.routes.entry(kind).or_insert_with(|| provider.clone());
            }
        }
        self
    }

    /// Routed kinds.
    pub fn kinds(&self) -> Vec<EmbeddingKind> {
        self.routes.keys().copied().collect()
    }
}

#[async_trait]
impl EmbeddingProvider for RoutingEmbeddingProvider {
    async fn embed(&self, text: &str, kind: EmbeddingKind) -> Result<QueryVector> {
        let provider = self.routes.get(&kind).ok_or_else(|| {
            Error::config(format!("No embedding provider configured for kind '{kind}'"))
        })?;
        log::debug!("Embedding {kind} query via '{}'", provider.name());
        provider.embed(text, kind).await
    }

    fn supports(&self, kind: EmbeddingKind) -> bool {
        self.routes.get(&kind).is_some_and(|p| p.supports(kind))
    }

    fn name(&self) -> &str {
        "routing"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct DenseOnly;

    #[async_trait]
    impl EmbeddingProvider for DenseOnly {
        async fn embed(&self, _text: &str, kind: EmbeddingKind) -> Result<QueryVector> {
            match kind {
                EmbeddingKind::Dense => Ok(QueryVector::Dense(vec![1.0, 0.0])),
                other => Err(Error::external("dense-only", format!("cannot embed {other}"))),
            }
        }

        fn supports(&self, kind: EmbeddingKind) -> bool {
            kind == EmbeddingKind::Dense
        }

        fn name(&self) -> &str {
            "dense-only"
        }
    }

    #[test]
    fn test_mock_provider_creation() {
        let provider = MockEmbeddingProvider::new(384);
        assert_eq!(provider.dimension(), 384);
        assert_eq!(provider.name(), "mock");
        assert!(EmbeddingKind::ALL.iter().all(|k| provider.supports(*k)));
    }

    #[tokio::test]
    async fn test_mock_embed_dense_unit_norm() {
        let provider = MockEmbeddingProvider::new(8);
        let QueryVector::Dense(embedding) =
            provider.embed("hello world", EmbeddingKind::Dense).await.unwrap()
        else {
            panic!("expected dense vector");
        };

        assert_eq!(embedding.len(), 8);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_mock_embed_deterministic() {
        let provider = MockEmbeddingProvider::new(16);
        for kind in EmbeddingKind::ALL {
            let e1 = provider.embed("same text", kind).await.unwrap();
            let e2 = provider.embed("same text", kind).await.unwrap();
            assert_eq!(e1, e2);
            assert!(e1.fits(kind));
        }
    }

    #[tokio::test]
    async fn test_mock_embed_small_is_narrower() {
        let provider = MockEmbeddingProvider::new(16);
        let QueryVector::Dense(small) = provider.embed("x", EmbeddingKind::Small).await.unwrap()
        else {
            panic!("expected dense vector");
        };
        assert_eq!(small.len(), 8);
    }

    #[tokio::test]
    async fn test_mock_embed_token_per_word() {
        let provider = MockEmbeddingProvider::new(4);
        let QueryVector::Multi(tokens) = provider
            .embed("engine oil capacity", EmbeddingKind::Token)
            .await
            .unwrap()
        else {
            panic!("expected multi vector");
        };
        assert_eq!(tokens.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_embed_sparse_parallel_arrays() {
        let provider = MockEmbeddingProvider::new(4);
        let QueryVector::Sparse(sparse) = provider
            .embed("oil oil filter", EmbeddingKind::Sparse)
            .await
            .unwrap()
        else {
            panic!("expected sparse vector");
        };
        assert_eq!(sparse.indices.len(), sparse.values.len());
        assert_eq!(sparse.indices.len(), 2);
        assert!(sparse.values.contains(&2.0));
    }

    #[test]
    fn test_ensure_supported() {
        let provider = DenseOnly;
        assert!(ensure_supported(&provider, &[EmbeddingKind::Dense]).is_ok());

        let err = ensure_supported(&provider, &[EmbeddingKind::Dense, EmbeddingKind::Token])
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("token"));
    }

    #[tokio::test]
    async fn test_routing_dispatches_by_kind() {
        let router = RoutingEmbeddingProvider::new()
            .with_route(EmbeddingKind::Dense, Arc::new(DenseOnly))
            .with_fallback(Arc::new(MockEmbeddingProvider::new(4)));

        let dense = router.embed("q", EmbeddingKind::Dense).await.unwrap();
        assert_eq!(dense, QueryVector::Dense(vec![1.0, 0.0]));

        let token = router.embed("q", EmbeddingKind::Token).await.unwrap();
        assert!(token.fits(EmbeddingKind::Token));
        assert_eq!(router.kinds().len(), 5);
    }

    #[tokio::test]
    async fn test_routing_unmapped_kind_is_config_error() {
        let router =
            RoutingEmbeddingProvider::new().with_route(EmbeddingKind::Dense, Arc::new(DenseOnly));

        assert!(!router.supports(EmbeddingKind::Large));
        let err = router.embed("q", EmbeddingKind::Large).await.unwrap_err();
        assert!(err.is_configuration());
    }
}
