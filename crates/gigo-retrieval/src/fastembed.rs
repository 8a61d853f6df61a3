//! FastEmbed embedding provider.
//!
//! Wraps the `fastembed` crate to provide local dense and sparse query
//! embeddings via pre-trained models (e.g., BGE-small, SPLADE).
//!
//! # Thread Safety
//!
//! `fastembed` models are not `Send + Sync`, so we wrap them in
//! `Arc<Mutex<>>` and use `tokio::task::spawn_blocking` for embedding calls.
//!
//! # Feature Gate
//!
//! This module requires the `fastembed` feature.

use crate::embedding::EmbeddingProvider;
use crate::types::{EmbeddingKind, QueryVector, SparseVector};
use async_trait::async_trait;
use gigo_core::{Error, Result};
use std::sync::{Arc, Mutex};

/// Map a model name string to a fastembed `EmbeddingModel` enum variant.
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "all-minilm-l6-v2" | "AllMiniLML6V2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-base-en-v1.5" | "BGEBaseENV15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" | "BGELargeENV15" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        other => Err(Error::config(format!(
            "Unknown embedding model: '{other}'. Supported: bge-small-en-v1.5, all-minilm-l6-v2, bge-base-en-v1.5, bge-large-en-v1.5"
        ))),
    }
}

/// Map a sparse model name to a fastembed `SparseModel` variant.
fn resolve_sparse_model(name: &str) -> Result<fastembed::SparseModel> {
    match name {
        "splade-pp-en-v1" | "SPLADEPPV1" | "prithivida/Splade_PP_en_v1" => {
            Ok(fastembed::SparseModel::SPLADEPPV1)
        }
        other => Err(Error::config(format!(
            "Unknown sparse model: '{other}'. Supported: splade-pp-en-v1"
        ))),
    }
}

fn blocking_error(e: tokio::task::JoinError) -> Error {
    Error::operation(format!("spawn_blocking failed: {e}"))
}

/// FastEmbed-based embedding provider.
///
/// Produces dense embeddings, and sparse embeddings when a sparse model is
/// configured. Models are loaded once and reused for all subsequent calls.
///
/// # Supported Models
///
/// | Name | Kind | Dimension |
/// |------|------|-----------|
/// | `bge-small-en-v1.5` | dense | 384 |
/// | `all-minilm-l6-v2` | dense | 384 |
/// | `bge-base-en-v1.5` | dense | 768 |
/// | `bge-large-en-v1.5` | dense | 1024 |
/// | `splade-pp-en-v1` | sparse | vocabulary |
pub struct FastEmbedProvider {
    dense: Arc<Mutex<fastembed::TextEmbedding>>,
    sparse: Option<Arc<Mutex<fastembed::SparseTextEmbedding>>>,
    model_name: String,
}

impl FastEmbedProvider {
    /// Create a new FastEmbed provider.
    ///
    /// Downloads models if not cached locally.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Dense model identifier (e.g., "bge-small-en-v1.5")
    /// * `sparse_model` - Optional sparse model identifier (e.g., "splade-pp-en-v1")
    /// * `cache_path` - Optional directory for model file caching
    pub fn new(model_name: &str, sparse_model: Option<&str>, cache_path: Option<&str>) -> Result<Self> {
        let mut init = fastembed::InitOptions::new(resolve_model(model_name)?);
        if let Some(path) = cache_path {
            init = init.with_cache_dir(std::path::PathBuf::from(path));
        }
        let dense = fastembed::TextEmbedding::try_new(init)
            .map_err(|e| Error::operation(format!("Failed to initialize fastembed model: {e}")))?;

        let sparse = match sparse_model {
            Some(name) => {
                let mut init = fastembed::SparseInitOptions::new(resolve_sparse_model(name)?);
                if let Some(path) = cache_path {
                    init = init.with_cache_dir(std::path::PathBuf::from(path));
                }
                let model = fastembed::SparseTextEmbedding::try_new(init).map_err(|e| {
                    Error::operation(format!("Failed to initialize sparse model: {e}"))
                })?;
                Some(Arc::new(Mutex::new(model)))
            }
            None => None,
        };

        log::info!(
            "Loaded fastembed model '{model_name}' (sparse: {})",
            sparse_model.unwrap_or("none")
        );

        Ok(Self {
            dense: Arc::new(Mutex::new(dense)),
            sparse,
            model_name: model_name.to_string(),
        })
    }

    async fn embed_dense(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.dense.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
            let results = model
                .embed(vec![text], None)
                .map_err(|e| Error::external("fastembed", format!("Embedding failed: {e}")))?;
            results
                .into_iter()
                .next()
                .ok_or_else(|| Error::external("fastembed", "No embedding returned"))
        })
        .await
        .map_err(blocking_error)?
    }

    async fn embed_sparse(&self, text: &str) -> Result<SparseVector> {
        let model = self
            .sparse
            .clone()
            .ok_or_else(|| Error::config("No sparse model configured for fastembed"))?;
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
            let results = model.embed(vec![text], None).map_err(|e| {
                Error::external("fastembed", format!("Sparse embedding failed: {e}"))
            })?;
            let embedding = results
                .into_iter()
                .next()
                .ok_or_else(|| Error::external("fastembed", "No sparse embedding returned"))?;
            Ok(SparseVector {
                indices: embedding.indices.into_iter().map(|i| i as u32).collect(),
                values: embedding.values,
            })
        })
        .await
        .map_err(blocking_error)?
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str, kind: EmbeddingKind) -> Result<QueryVector> {
        match kind {
            EmbeddingKind::Dense => Ok(QueryVector::Dense(self.embed_dense(text).await?)),
            EmbeddingKind::Sparse => Ok(QueryVector::Sparse(self.embed_sparse(text).await?)),
            other => Err(Error::config(format!(
                "fastembed provider cannot produce {other} embeddings"
            ))),
        }
    }

    fn supports(&self, kind: EmbeddingKind) -> bool {
        match kind {
            EmbeddingKind::Dense => true,
            EmbeddingKind::Sparse => self.sparse.is_some(),
            _ => false,
        }
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("sparse", &self.sparse.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_known() {
        assert!(resolve_model("bge-small-en-v1.5").is_ok());
        assert!(resolve_model("all-minilm-l6-v2").is_ok());
        assert!(resolve_model("BGESmallENV15").is_ok());
    }

    #[test]
    fn test_resolve_model_unknown() {
        let err = resolve_model("nonexistent-model").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding model"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_resolve_sparse_model() {
        assert!(resolve_sparse_model("splade-pp-en-v1").is_ok());
        assert!(resolve_sparse_model("bm42").is_err());
    }

    #[tokio::test]
    #[ignore = "requires model download (~50MB)"]
    async fn test_fastembed_dense_embedding() {
        let provider = FastEmbedProvider::new("bge-small-en-v1.5", None, None).unwrap();
        assert!(provider.supports(EmbeddingKind::Dense));
        assert!(!provider.supports(EmbeddingKind::Sparse));

        let QueryVector::Dense(embedding) =
            provider.embed("Hello world", EmbeddingKind::Dense).await.unwrap()
        else {
            panic!("expected dense vector");
        };
        assert_eq!(embedding.len(), 384);
    }

    #[tokio::test]
    #[ignore = "requires model download (~50MB)"]
    async fn test_fastembed_token_kind_rejected() {
        let provider = FastEmbedProvider::new("bge-small-en-v1.5", None, None).unwrap();
        let err = provider.embed("x", EmbeddingKind::Token).await.unwrap_err();
        assert!(err.is_configuration());
    }
}
