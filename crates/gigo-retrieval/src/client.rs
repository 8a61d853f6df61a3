//! Vector search client trait and in-process implementations.
//!
//! A `VectorSearchClient` executes one similarity search in one embedding
//! space of a collection, optionally restricted to a set of ids. Strategies
//! compose several such calls into a ranked candidate list.
//!
//! # Clients
//!
//! - `InMemorySearchClient`: brute-force scoring over stored points
//! - `StaticSearchClient`: fixed results per embedding kind, for tests
//! - `QdrantSearchClient`: remote search over HTTP (see `qdrant`)

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use gigo_core::{Error, Result};

use crate::types::{
    CandidateRecord, EmbeddingKind, Payload, QueryVector, RankedList, SearchRequest,
    SparseVector,
};

/// Trait for vector search backends.
///
/// Implementations must be safe to share across concurrently running
/// strategies and must not retry failed calls.
#[async_trait]
pub trait VectorSearchClient: Send + Sync {
    /// Execute one search. Results are ordered best first, at most
    /// `request.limit` long, and contain only ids admitted by the filter.
    async fn search(&self, request: SearchRequest) -> Result<RankedList>;

    /// The client name for diagnostics.
    fn name(&self) -> &str;
}

// ============================================================================
// Similarity functions
// ============================================================================

/// Cosine similarity of two dense vectors. Zero when either is all zeros
/// or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Dot product over shared indices of two sparse vectors.
pub fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let weights: HashMap<u32, f32> = b.indices.iter().copied().zip(b.values.iter().copied()).collect();
    a.indices
        .iter()
        .zip(&a.values)
        .filter_map(|(i, v)| weights.get(i).map(|w| v * w))
        .sum()
}

/// Late-interaction (MaxSim) score: for every query token, the best dot
/// product against any document token, summed.
pub fn max_sim(query: &[Vec<f32>], document: &[Vec<f32>]) -> f32 {
    query
        .iter()
        .map(|q| {
            document
                .iter()
                .map(|d| q.iter().zip(d).map(|(x, y)| x * y).sum::<f32>())
                .fold(f32::NEG_INFINITY, f32::max)
        })
        .filter(|s| s.is_finite())
        .sum()
}

/// Score a stored vector against a query vector of the same shape.
fn similarity(query: &QueryVector, stored: &QueryVector) -> Option<f32> {
    match (query, stored) {
        (QueryVector::Dense(q), QueryVector::Dense(d)) => Some(cosine_similarity(q, d)),
        (QueryVector::Sparse(q), QueryVector::Sparse(d)) => Some(sparse_dot(q, d)),
        (QueryVector::Multi(q), QueryVector::Multi(d)) => Some(max_sim(q, d)),
        _ => None,
    }
}

// ============================================================================
// In-memory client
// ============================================================================

/// A stored point with named vectors and a payload.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    /// Point id.
    pub id: String,
    /// Vectors by embedding kind.
    pub vectors: HashMap<EmbeddingKind, QueryVector>,
    /// Payload returned with results.
    pub payload: Payload,
}

impl StoredPoint {
    /// Create a point with no vectors.
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            vectors: HashMap::new(),
            payload: match payload {
                Value::Object(map) => map,
                _ => Payload::new(),
            },
        }
    }

    /// Attach a vector for `kind`.
    pub fn with_vector(mut self, kind: EmbeddingKind, vector: QueryVector) -> Self {
        self.vectors.insert(kind, vector);
        self
    }
}

/// Brute-force search client over in-memory collections.
///
/// Dense, small and large vectors are scored by cosine similarity, sparse
/// vectors by dot product, and token vectors by MaxSim. Points lacking a
/// vector of the requested kind are not candidates.
#[derive(Debug, Default)]
pub struct InMemorySearchClient {
    collections: HashMap<String, Vec<StoredPoint>>,
}

impl InMemorySearchClient {
    /// Create a client with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point to a collection, creating the collection if needed.
    pub fn insert(&mut self, collection: impl Into<String>, point: StoredPoint) {
        self.collections.entry(collection.into()).or_default().push(point);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_point(mut self, collection: impl Into<String>, point: StoredPoint) -> Self {
        self.insert(collection, point);
        self
    }

    /// Number of points in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, Vec::len)
    }
}

#[async_trait]
impl VectorSearchClient for InMemorySearchClient {
    async fn search(&self, request: SearchRequest) -> Result<RankedList> {
        let points = self.collections.get(&request.collection).ok_or_else(|| {
            Error::external(
                "in-memory",
                format!("Collection '{}' not found", request.collection),
            )
        })?;

        let mut scored: Vec<CandidateRecord> = points
            .iter()
            .filter(|p| request.filter.as_ref().is_none_or(|f| f.admits(&p.id)))
            .filter_map(|p| {
                let stored = p.vectors.get(&request.kind)?;
                let score = similarity(&request.vector, stored)?;
                Some(CandidateRecord {
                    id: p.id.clone(),
                    score,
                    payload: p.payload.clone(),
                })
            })
            .collect();

        // Deterministic order for equal scores.
        scored.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(RankedList::from_records(scored).truncated(request.limit))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

// ============================================================================
// Static client
// ============================================================================

/// Returns preset results per embedding kind, recording every request.
///
/// Filters and limits are honoured, so strategies behave as they would
/// against a live service. Useful in tests and offline demos.
#[derive(Debug, Default)]
pub struct StaticSearchClient {
    results: HashMap<EmbeddingKind, Vec<CandidateRecord>>,
    failures: HashMap<EmbeddingKind, String>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl StaticSearchClient {
    /// Create a client with no preset results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset the results for `kind`.
    pub fn with_results(mut self, kind: EmbeddingKind, records: Vec<CandidateRecord>) -> Self {
        self.results.insert(kind, records);
        self
    }

    /// Make searches of `kind` fail with an external service error.
    pub fn with_failure(mut self, kind: EmbeddingKind, message: impl Into<String>) -> Self {
        self.failures.insert(kind, message.into());
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorSearchClient for StaticSearchClient {
    async fn search(&self, request: SearchRequest) -> Result<RankedList> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }

        if let Some(message) = self.failures.get(&request.kind) {
            return Err(Error::external("static", message.clone()));
        }

        let records = self
            .results
            .get(&request.kind)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| request.filter.as_ref().is_none_or(|f| f.admits(&r.id)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(RankedList::from_records(records).truncated(request.limit))
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchFilter;
    use serde_json::json;

    fn dense(v: &[f32]) -> QueryVector {
        QueryVector::Dense(v.to_vec())
    }

    fn sample_client() -> InMemorySearchClient {
        InMemorySearchClient::new()
            .with_point(
                "manual",
                StoredPoint::new("p45", json!({"page_number": 45}))
                    .with_vector(EmbeddingKind::Dense, dense(&[1.0, 0.0]))
                    .with_vector(
                        EmbeddingKind::Token,
                        QueryVector::Multi(vec![vec![8.0, 0.0], vec![0.0, 1.0]]),
                    ),
            )
            .with_point(
                "manual",
                StoredPoint::new("p236", json!({"page_number": 236}))
                    .with_vector(EmbeddingKind::Dense, dense(&[0.6, 0.8]))
                    .with_vector(EmbeddingKind::Token, QueryVector::Multi(vec![vec![3.0, 0.0]])),
            )
            .with_point(
                "manual",
                StoredPoint::new("p9", json!({"page_number": 9}))
                    .with_vector(EmbeddingKind::Dense, dense(&[0.0, 1.0])),
            )
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_sparse_dot() {
        let a = SparseVector {
            indices: vec![1, 5, 9],
            values: vec![1.0, 2.0, 3.0],
        };
        let b = SparseVector {
            indices: vec![5, 9, 11],
            values: vec![0.5, 1.0, 4.0],
        };
        assert!((sparse_dot(&a, &b) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_max_sim() {
        let query = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let doc = vec![vec![8.0, 0.0], vec![0.0, 2.0], vec![1.0, 1.0]];
        assert!((max_sim(&query, &doc) - 10.0).abs() < 1e-6);
        assert_eq!(max_sim(&query, &[]), 0.0);
    }

    #[tokio::test]
    async fn test_in_memory_dense_search() {
        let client = sample_client();
        let request = SearchRequest::new("manual", EmbeddingKind::Dense, dense(&[1.0, 0.0]), 2);
        let results = client.search(request).await.unwrap();

        assert_eq!(results.ids(), vec!["p45", "p236"]);
        assert_eq!(results.records()[0].page_number(), Some(45));
    }

    #[tokio::test]
    async fn test_in_memory_token_search_skips_points_without_kind() {
        let client = sample_client();
        let request = SearchRequest::new(
            "manual",
            EmbeddingKind::Token,
            QueryVector::Multi(vec![vec![1.0, 0.0]]),
            10,
        );
        let results = client.search(request).await.unwrap();

        assert_eq!(results.ids(), vec!["p45", "p236"]);
        assert!((results.records()[0].score - 8.0).abs() < 1e-6);
        assert!((results.records()[1].score - 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_in_memory_filter() {
        let client = sample_client();
        let request = SearchRequest::new("manual", EmbeddingKind::Dense, dense(&[1.0, 0.0]), 10)
            .with_filter(SearchFilter {
                ids: vec!["p9".to_string()],
            });
        let results = client.search(request).await.unwrap();
        assert_eq!(results.ids(), vec!["p9"]);
    }

    #[tokio::test]
    async fn test_in_memory_missing_collection() {
        let client = sample_client();
        let request = SearchRequest::new("nope", EmbeddingKind::Dense, dense(&[1.0]), 1);
        let err = client.search(request).await.unwrap_err();
        assert!(err.is_external());
        assert_eq!(client.len("manual"), 3);
    }

    #[tokio::test]
    async fn test_static_client_honours_filter_and_limit() {
        let client = StaticSearchClient::new().with_results(
            EmbeddingKind::Dense,
            vec![
                CandidateRecord::new("a", 1.0),
                CandidateRecord::new("b", 3.0),
                CandidateRecord::new("c", 2.0),
            ],
        );

        let all = client
            .search(SearchRequest::new("c", EmbeddingKind::Dense, dense(&[1.0]), 2))
            .await
            .unwrap();
        assert_eq!(all.ids(), vec!["b", "c"]);

        let filtered = client
            .search(
                SearchRequest::new("c", EmbeddingKind::Dense, dense(&[1.0]), 10).with_filter(
                    SearchFilter {
                        ids: vec!["a".to_string()],
                    },
                ),
            )
            .await
            .unwrap();
        assert_eq!(filtered.ids(), vec!["a"]);
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_static_client_failure_and_unknown_kind() {
        let client = StaticSearchClient::new().with_failure(EmbeddingKind::Sparse, "down");

        let err = client
            .search(SearchRequest::new("c", EmbeddingKind::Sparse, dense(&[1.0]), 1))
            .await
            .unwrap_err();
        assert!(err.is_external());

        let empty = client
            .search(SearchRequest::new("c", EmbeddingKind::Large, dense(&[1.0]), 1))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }
}
