//! Common types for the retrieval module.
//!
//! These types are shared by every strategy, embedding provider and search
//! client, and are always available regardless of feature flags.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use gigo_core::{Error, Result};

/// Default number of results returned by a strategy.
pub const DEFAULT_LIMIT: usize = 10;

/// Default width of the prefetch stage.
pub const DEFAULT_PREFETCH_LIMIT: usize = 30;

/// Default minimum reranked score.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 5.0;

/// Loosely structured payload attached to a retrieved record.
pub type Payload = serde_json::Map<String, Value>;

/// Payload key under which page-level metadata may be nested.
const NESTED_PAGE_METADATA: &str = "full_page_metadata";

// ============================================================================
// Embedding kinds and query vectors
// ============================================================================

/// The embedding spaces a collection can be searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    /// Fixed-length semantic vector.
    Dense,
    /// Indices + values over a vocabulary.
    Sparse,
    /// Per-token vectors for late-interaction scoring.
    Token,
    /// Low-dimensional member of a multi-resolution family.
    Small,
    /// High-dimensional member of a multi-resolution family.
    Large,
}

impl EmbeddingKind {
    /// All kinds, in declaration order.
    pub const ALL: [EmbeddingKind; 5] = [
        EmbeddingKind::Dense,
        EmbeddingKind::Sparse,
        EmbeddingKind::Token,
        EmbeddingKind::Small,
        EmbeddingKind::Large,
    ];

    /// Canonical name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Sparse => "sparse",
            Self::Token => "token",
            Self::Small => "small",
            Self::Large => "large",
        }
    }

    /// Default named-vector slot used for this kind in a collection.
    pub fn default_vector_name(&self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Sparse => "sparse",
            Self::Token => "colbert",
            Self::Small => "small-embedding",
            Self::Large => "large-embedding",
        }
    }
}

impl fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(Self::Dense),
            "sparse" => Ok(Self::Sparse),
            "token" | "colbert" | "late_interaction" | "late-interaction" => Ok(Self::Token),
            "small" | "small-embedding" => Ok(Self::Small),
            "large" | "large-embedding" => Ok(Self::Large),
            other => Err(Error::config(format!(
                "Unknown embedding kind: '{other}'. Supported: dense, sparse, token, small, large"
            ))),
        }
    }
}

/// A sparse vector as parallel index/value arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Vocabulary indices with non-zero weight.
    pub indices: Vec<u32>,
    /// Weights, parallel to `indices`.
    pub values: Vec<f32>,
}

/// An embedding of query text in one embedding space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryVector {
    /// One vector (dense, small, large).
    Dense(Vec<f32>),
    /// Sparse indices/values.
    Sparse(SparseVector),
    /// One vector per token.
    Multi(Vec<Vec<f32>>),
}

impl QueryVector {
    /// Whether this vector shape is valid for the given kind.
    pub fn fits(&self, kind: EmbeddingKind) -> bool {
        matches!(
            (self, kind),
            (
                Self::Dense(_),
                EmbeddingKind::Dense | EmbeddingKind::Small | EmbeddingKind::Large
            ) | (Self::Sparse(_), EmbeddingKind::Sparse)
                | (Self::Multi(_), EmbeddingKind::Token)
        )
    }
}

// ============================================================================
// Candidate records
// ============================================================================

/// One retrieved unit of content.
///
/// `score` is only meaningful relative to other records produced by the same
/// strategy invocation; fused scores live on their own scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Identifier, unique within a collection.
    pub id: String,

    /// Relevance score (higher is better).
    pub score: f32,

    /// Loosely structured payload.
    #[serde(default)]
    pub payload: Payload,
}

impl CandidateRecord {
    /// Create a record with an empty payload.
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            payload: Payload::new(),
        }
    }

    /// Replace the payload. Non-object values yield an empty payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = match payload {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        self
    }

    /// A copy of this record carrying a different score.
    pub fn rescored(&self, score: f32) -> Self {
        Self {
            id: self.id.clone(),
            score,
            payload: self.payload.clone(),
        }
    }

    /// Look up a payload field at the top level, falling back to nested
    /// page metadata.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload
            .get(name)
            .filter(|v| !v.is_null())
            .or_else(|| {
                self.payload
                    .get(NESTED_PAGE_METADATA)
                    .and_then(|nested| nested.get(name))
                    .filter(|v| !v.is_null())
            })
    }

    /// The page number this record was extracted from, if recorded.
    pub fn page_number(&self) -> Option<u32> {
        self.field("page_number").and_then(value_as_page)
    }

    /// The text that was embedded for this record, if present.
    pub fn embedding_text(&self) -> Option<&str> {
        self.field("embedding_text").and_then(Value::as_str)
    }
}

/// Interpret a JSON value as a page number (integer or numeric string).
pub fn value_as_page(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Sort key placing NaN below every real score.
fn score_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Descending score comparison with NaN last.
pub(crate) fn cmp_score_desc(a: f32, b: f32) -> std::cmp::Ordering {
    score_key(b).total_cmp(&score_key(a))
}

// ============================================================================
// Ranked lists
// ============================================================================

/// Candidates ordered by descending score with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedList {
    records: Vec<CandidateRecord>,
}

impl RankedList {
    /// An empty list: the valid "no relevant content" outcome.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a ranked list from records in any order.
    ///
    /// Sorting is stable, so equal scores keep their incoming order. When an
    /// id appears more than once only its best-ranked occurrence is kept.
    pub fn from_records(mut records: Vec<CandidateRecord>) -> Self {
        records.sort_by(|a, b| cmp_score_desc(a.score, b.score));
        let mut seen = HashSet::with_capacity(records.len());
        records.retain(|r| seen.insert(r.id.clone()));
        Self { records }
    }

    /// The records, best first.
    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records, best first.
    pub fn iter(&self) -> std::slice::Iter<'_, CandidateRecord> {
        self.records.iter()
    }

    /// Ids in rank order.
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Find a record by id.
    pub fn get(&self, id: &str) -> Option<&CandidateRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Whether a record with this id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Keep at most `limit` records.
    pub fn truncated(mut self, limit: usize) -> Self {
        self.records.truncate(limit);
        self
    }

    /// Drop records scoring below `threshold`. `None` keeps everything.
    pub fn at_least(mut self, threshold: Option<f32>) -> Self {
        if let Some(min) = threshold {
            self.records.retain(|r| r.score >= min);
        }
        self
    }
}

impl IntoIterator for RankedList {
    type Item = CandidateRecord;
    type IntoIter = std::vec::IntoIter<CandidateRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RankedList {
    type Item = &'a CandidateRecord;
    type IntoIter = std::slice::Iter<'a, CandidateRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Restricts a search to a set of record ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Only records with these ids may be returned.
    pub ids: Vec<String>,
}

impl SearchFilter {
    /// Filter to the ids of a ranked list.
    pub fn only(list: &RankedList) -> Self {
        Self { ids: list.ids() }
    }

    /// Whether an id passes the filter.
    pub fn admits(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }
}

/// One call to a vector search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Collection to search.
    pub collection: String,

    /// Embedding space to search in.
    pub kind: EmbeddingKind,

    /// Query embedding in that space.
    pub vector: QueryVector,

    /// Maximum results.
    pub limit: usize,

    /// Optional id restriction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchFilter>,
}

impl SearchRequest {
    /// Create an unfiltered search request.
    pub fn new(
        collection: impl Into<String>,
        kind: EmbeddingKind,
        vector: QueryVector,
        limit: usize,
    ) -> Self {
        Self {
            collection: collection.into(),
            kind,
            vector,
            limit,
            filter: None,
        }
    }

    /// Restrict the search to the given filter.
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Parameters for one strategy invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// The (sub-)question to retrieve evidence for.
    pub query: String,

    /// Maximum results to return.
    pub limit: usize,

    /// Width of the prefetch stage.
    pub prefetch_limit: usize,

    /// Minimum score of returned records. `None` disables the cut.
    pub score_threshold: Option<f32>,

    /// Collection to search.
    pub collection_name: String,
}

impl RetrievalRequest {
    /// Create a request with default limits.
    pub fn new(query: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            prefetch_limit: DEFAULT_PREFETCH_LIMIT,
            score_threshold: Some(DEFAULT_SCORE_THRESHOLD),
            collection_name: collection_name.into(),
        }
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the prefetch width.
    pub fn with_prefetch_limit(mut self, prefetch_limit: usize) -> Self {
        self.prefetch_limit = prefetch_limit;
        self
    }

    /// Set (or clear) the score threshold.
    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Same parameters for a different query.
    pub fn for_query(&self, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..self.clone()
        }
    }

    /// Check the request before any external call is made.
    pub fn validate(&self) -> Result<()> {
        if self.limit < 1 {
            return Err(Error::config("limit must be at least 1"));
        }
        if self.prefetch_limit < self.limit {
            return Err(Error::config(format!(
                "prefetch_limit ({}) must be >= limit ({})",
                self.prefetch_limit, self.limit
            )));
        }
        if self.collection_name.trim().is_empty() {
            return Err(Error::config("collection_name must not be empty"));
        }
        if self.score_threshold.is_some_and(f32::is_nan) {
            return Err(Error::config("score_threshold must be a number"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ------------------------------------------------------------------------
    // EmbeddingKind tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_embedding_kind_parse() {
        assert_eq!("dense".parse::<EmbeddingKind>().unwrap(), EmbeddingKind::Dense);
        assert_eq!("colbert".parse::<EmbeddingKind>().unwrap(), EmbeddingKind::Token);
        assert_eq!(
            "Large-Embedding".parse::<EmbeddingKind>().unwrap(),
            EmbeddingKind::Large
        );
    }

    #[test]
    fn test_embedding_kind_unknown_is_config_error() {
        let err = "holographic".parse::<EmbeddingKind>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Unknown embedding kind"));
    }

    #[test]
    fn test_embedding_kind_vector_names() {
        assert_eq!(EmbeddingKind::Token.default_vector_name(), "colbert");
        assert_eq!(EmbeddingKind::Small.default_vector_name(), "small-embedding");
    }

    #[test]
    fn test_query_vector_fits() {
        assert!(QueryVector::Dense(vec![0.1]).fits(EmbeddingKind::Small));
        assert!(!QueryVector::Dense(vec![0.1]).fits(EmbeddingKind::Token));
        assert!(QueryVector::Multi(vec![vec![0.1]]).fits(EmbeddingKind::Token));
        let sparse = QueryVector::Sparse(SparseVector {
            indices: vec![1],
            values: vec![0.5],
        });
        assert!(sparse.fits(EmbeddingKind::Sparse));
        assert!(!sparse.fits(EmbeddingKind::Dense));
    }

    // ------------------------------------------------------------------------
    // CandidateRecord tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_candidate_page_number() {
        let record = CandidateRecord::new("p45", 8.0).with_payload(json!({"page_number": 45}));
        assert_eq!(record.page_number(), Some(45));

        let string_page =
            CandidateRecord::new("p46", 1.0).with_payload(json!({"page_number": "46"}));
        assert_eq!(string_page.page_number(), Some(46));

        assert_eq!(CandidateRecord::new("none", 1.0).page_number(), None);
    }

    #[test]
    fn test_candidate_field_falls_back_to_nested_metadata() {
        let record = CandidateRecord::new("p1", 1.0).with_payload(json!({
            "page_number": 1,
            "full_page_metadata": {"content_elements": [{"type": "table"}]}
        }));
        assert!(record.field("content_elements").is_some());
        assert!(record.field("flattened_tables").is_none());
    }

    #[test]
    fn test_candidate_non_object_payload() {
        let record = CandidateRecord::new("x", 1.0).with_payload(json!([1, 2, 3]));
        assert!(record.payload.is_empty());
    }

    // ------------------------------------------------------------------------
    // RankedList tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_ranked_list_sorts_and_dedups() {
        let list = RankedList::from_records(vec![
            CandidateRecord::new("a", 1.0),
            CandidateRecord::new("b", 3.0),
            CandidateRecord::new("a", 2.0),
            CandidateRecord::new("c", 2.5),
        ]);
        assert_eq!(list.ids(), vec!["b", "c", "a"]);
        assert_eq!(list.get("a").unwrap().score, 2.0);
    }

    #[test]
    fn test_ranked_list_stable_ties() {
        let list = RankedList::from_records(vec![
            CandidateRecord::new("z", 1.0),
            CandidateRecord::new("y", 1.0),
        ]);
        assert_eq!(list.ids(), vec!["z", "y"]);
    }

    #[test]
    fn test_ranked_list_nan_sorts_last() {
        let list = RankedList::from_records(vec![
            CandidateRecord::new("nan", f32::NAN),
            CandidateRecord::new("low", -100.0),
        ]);
        assert_eq!(list.ids(), vec!["low", "nan"]);
    }

    #[test]
    fn test_ranked_list_threshold_and_truncate() {
        let list = RankedList::from_records(vec![
            CandidateRecord::new("a", 8.0),
            CandidateRecord::new("b", 5.0),
            CandidateRecord::new("c", 3.0),
        ]);
        let kept = list.clone().at_least(Some(5.0));
        assert_eq!(kept.ids(), vec!["a", "b"]);
        assert_eq!(list.clone().at_least(None).len(), 3);
        assert_eq!(list.truncated(1).ids(), vec!["a"]);
    }

    #[test]
    fn test_ranked_list_empty() {
        let list = RankedList::empty();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    // ------------------------------------------------------------------------
    // RetrievalRequest tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_request_defaults() {
        let request = RetrievalRequest::new("oil capacity", "manual");
        assert_eq!(request.limit, 10);
        assert_eq!(request.prefetch_limit, 30);
        assert_eq!(request.score_threshold, Some(5.0));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        let zero = RetrievalRequest::new("q", "c").with_limit(0);
        assert!(zero.validate().unwrap_err().is_configuration());

        let narrow = RetrievalRequest::new("q", "c")
            .with_limit(10)
            .with_prefetch_limit(5);
        assert!(narrow.validate().unwrap_err().to_string().contains("prefetch_limit"));

        let equal = RetrievalRequest::new("q", "c")
            .with_limit(10)
            .with_prefetch_limit(10);
        assert!(equal.validate().is_ok());

        let no_collection = RetrievalRequest::new("q", " ");
        assert!(no_collection.validate().is_err());

        let nan = RetrievalRequest::new("q", "c").with_threshold(Some(f32::NAN));
        assert!(nan.validate().is_err());

        let negative = RetrievalRequest::new("q", "c").with_threshold(Some(-3.5));
        assert!(negative.validate().is_ok());
    }

    #[test]
    fn test_request_for_query() {
        let base = RetrievalRequest::new("first", "c").with_limit(3);
        let other = base.for_query("second");
        assert_eq!(other.query, "second");
        assert_eq!(other.limit, 3);
    }

    #[test]
    fn test_search_filter() {
        let list = RankedList::from_records(vec![CandidateRecord::new("a", 1.0)]);
        let filter = SearchFilter::only(&list);
        assert!(filter.admits("a"));
        assert!(!filter.admits("b"));
    }
}
