//! Qdrant search client.
//!
//! Talks to the Qdrant HTTP query API. Each embedding kind maps to a named
//! vector in the collection; id restrictions become a `has_id` filter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

use gigo_core::{Error, Result};

use crate::client::VectorSearchClient;
use crate::types::{CandidateRecord, EmbeddingKind, Payload, QueryVector, RankedList, SearchRequest};

/// Default Qdrant HTTP endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Search client for a Qdrant server.
pub struct QdrantSearchClient {
    base_url: String,
    api_key: Option<String>,
    vector_names: HashMap<EmbeddingKind, String>,
    client: reqwest::Client,
}

impl QdrantSearchClient {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let vector_names = EmbeddingKind::ALL
            .iter()
            .map(|k| (*k, k.default_vector_name().to_string()))
            .collect();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            vector_names,
            client: reqwest::Client::new(),
        }
    }

    /// Authenticate with an API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the named vector used for `kind`.
    pub fn with_vector_name(mut self, kind: EmbeddingKind, name: impl Into<String>) -> Self {
        self.vector_names.insert(kind, name.into());
        self
    }

    /// Set a request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    /// Build the JSON body of a query request.
    fn query_body(&self, request: &SearchRequest) -> Value {
        let using = self
            .vector_names
            .get(&request.kind)
            .map(String::as_str)
            .unwrap_or_else(|| request.kind.default_vector_name());

        let query = match &request.vector {
            QueryVector::Dense(v) => json!(v),
            QueryVector::Sparse(s) => json!({"indices": s.indices, "values": s.values}),
            QueryVector::Multi(m) => json!(m),
        };

        let mut body = json!({
            "query": query,
            "using": using,
            "limit": request.limit,
            "with_payload": true,
        });

        if let Some(filter) = &request.filter {
            let ids: Vec<Value> = filter.ids.iter().map(|id| point_id_to_json(id)).collect();
            body["filter"] = json!({"must": [{"has_id": ids}]});
        }

        body
    }
}

/// Qdrant ids are unsigned integers or UUID strings.
fn point_id_to_json(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(n) => json!(n),
        Err(_) => json!(id),
    }
}

fn point_id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

/// Convert a query response into a ranked list.
fn parse_points(body: QueryResponse) -> RankedList {
    let records = body
        .result
        .points
        .into_iter()
        .filter_map(|p| {
            let Some(id) = point_id_to_string(&p.id) else {
                log::warn!("Skipping point with unsupported id: {}", p.id);
                return None;
            };
            Some(CandidateRecord {
                id,
                score: p.score,
                payload: p.payload.unwrap_or_default(),
            })
        })
        .collect();
    RankedList::from_records(records)
}

#[async_trait]
impl VectorSearchClient for QdrantSearchClient {
    async fn search(&self, request: SearchRequest) -> Result<RankedList> {
        let url = format!(
            "{}/collections/{}/points/query",
            self.base_url, request.collection
        );
        let body = self.query_body(&request);
        log::debug!(
            "Qdrant query on '{}' using {} (limit {}, filtered: {})",
            request.collection,
            request.kind,
            request.limit,
            request.filter.is_some()
        );

        let mut call = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            call = call.header("api-key", key);
        }

        let response = call
            .send()
            .await
            .map_err(|e| Error::external("qdrant", format!("Failed to call Qdrant: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::external(
                "qdrant",
                format!("Query on '{}' failed with {status}: {error_text}", request.collection),
            ));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::external("qdrant", format!("Failed to parse response: {e}")))?;

        Ok(parse_points(parsed).truncated(request.limit))
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{SearchFilter, SparseVector};

    #[test]
    fn test_query_body_dense() {
        let client = QdrantSearchClient::new("http://localhost:6333/");
        assert_eq!(client.base_url, "http://localhost:6333");

        let request = SearchRequest::new(
            "manual",
            EmbeddingKind::Small,
            QueryVector::Dense(vec![0.5, 0.25]),
            30,
        );
        let body = client.query_body(&request);
        assert_eq!(body["using"], "small-embedding");
        assert_eq!(body["limit"], 30);
        assert_eq!(body["with_payload"], true);
        assert!(body.get("filter").is_none());
    }

    #[test]
    fn test_query_body_sparse_with_filter() {
        let client = QdrantSearchClient::new(DEFAULT_QDRANT_URL).with_vector_name(EmbeddingKind::Sparse, "bm25");
        let request = SearchRequest::new(
            "manual",
            EmbeddingKind::Sparse,
            QueryVector::Sparse(SparseVector {
                indices: vec![3, 7],
                values: vec![0.5, 1.5],
            }),
            5,
        )
        .with_filter(SearchFilter {
            ids: vec!["42".to_string(), "6f1c8e1a-1b7e-4a53-9a38-2f4d1e9a7c10".to_string()],
        });

        let body = client.query_body(&request);
        assert_eq!(body["using"], "bm25");
        assert_eq!(body["query"]["indices"][1], 7);
        let has_id = &body["filter"]["must"][0]["has_id"];
        assert_eq!(has_id[0], 42);
        assert_eq!(has_id[1], "6f1c8e1a-1b7e-4a53-9a38-2f4d1e9a7c10");
    }

    #[test]
    fn test_query_body_token_uses_colbert() {
        let client = QdrantSearchClient::new(DEFAULT_QDRANT_URL);
        let request = SearchRequest::new(
            "manual",
            EmbeddingKind::Token,
            QueryVector::Multi(vec![vec![1.0], vec![2.0]]),
            3,
        );
        let body = client.query_body(&request);
        assert_eq!(body["using"], "colbert");
        assert_eq!(body["query"][1][0], 2.0);
    }

    #[test]
    fn test_parse_points() {
        let raw = json!({
            "status": "ok",
            "result": {"points": [
                {"id": 7, "score": 3.0, "payload": {"page_number": 236}},
                {"id": "abc", "score": 8.0, "payload": {"page_number": 45}},
                {"id": null, "score": 9.0}
            ]}
        });
        let parsed: QueryResponse = serde_json::from_value(raw).unwrap();
        let list = parse_points(parsed);

        assert_eq!(list.ids(), vec!["abc", "7"]);
        assert_eq!(list.records()[1].page_number(), Some(236));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_external_error() {
        let client = QdrantSearchClient::new("http://127.0.0.1:1")
            .with_timeout(Duration::from_millis(200))
            .unwrap();
        let request = SearchRequest::new("manual", EmbeddingKind::Dense, QueryVector::Dense(vec![1.0]), 1);
        let err = client.search(request).await.unwrap_err();
        assert!(err.is_external());
    }
}
