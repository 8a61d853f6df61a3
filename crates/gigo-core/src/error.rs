//! Error types for Gigo operations.
//!
//! This module provides a common `Error` type and `Result<T>` alias used across
//! all Gigo crates. Uses `thiserror` for derive macros.
//!
//! The variants follow the retrieval error taxonomy:
//!
//! - [`Error::ExternalService`]: a vector search, embedding or LLM call failed.
//!   Never retried internally; surfaced to the caller.
//! - [`Error::MalformedPayload`]: an extractor could not parse one payload
//!   entry. Recovered locally by skipping that entry.
//! - [`Error::Config`]: invalid limits, unknown strategy or embedding kind.
//!   Raised before any external call is made.
//!
//! "Found nothing" is never an error: empty result lists are valid values.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur in Gigo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error (invalid limits, unknown strategy, unknown embedding kind).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call to an external collaborator (vector search, embeddings, LLM) failed.
    #[error("{service} error: {message}")]
    ExternalService {
        /// Name of the failing service, e.g. "qdrant" or "openai".
        service: String,
        /// Human-readable failure description.
        message: String,
    },

    /// A payload entry could not be parsed by an extractor.
    #[error("Malformed payload in '{field}': {message}")]
    MalformedPayload {
        /// Payload field being parsed.
        field: String,
        /// Parse failure description.
        message: String,
    },

    /// A retrieval strategy invocation failed.
    ///
    /// Carries enough context to diagnose the failure without exposing
    /// internal record identifiers.
    #[error("Retrieval with strategy '{strategy}' on collection '{collection}' failed for \"{query}\": {source}")]
    Retrieval {
        /// Strategy name.
        strategy: String,
        /// Collection that was queried.
        collection: String,
        /// The sub-question being answered.
        query: String,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Content not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic operation failure.
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an external service error.
    pub fn external(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: msg.into(),
        }
    }

    /// Create a malformed payload error.
    pub fn malformed(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedPayload {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Wrap an error with retrieval context.
    pub fn retrieval(
        strategy: impl Into<String>,
        collection: impl Into<String>,
        query: impl Into<String>,
        source: Error,
    ) -> Self {
        Self::Retrieval {
            strategy: strategy.into(),
            collection: collection.into(),
            query: query.into(),
            source: Box::new(source),
        }
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a generic operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Wrap a plain I/O error.
    pub fn io(err: std::io::Error) -> Self {
        Self::Io(err)
    }

    /// Wrap an I/O error with the path that caused it.
    pub fn io_with_path(err: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source: err,
        }
    }

    /// Whether this error is a configuration error, including one wrapped
    /// in retrieval context.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Retrieval { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Whether this error came from an external collaborator.
    pub fn is_external(&self) -> bool {
        match self {
            Self::ExternalService { .. } => true,
            Self::Retrieval { source, .. } => source.is_external(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Gigo's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("limit must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: limit must be at least 1"
        );
        assert!(err.is_configuration());
        assert!(!err.is_external());
    }

    #[test]
    fn test_external_error_display() {
        let err = Error::external("qdrant", "collection not found");
        assert_eq!(err.to_string(), "qdrant error: collection not found");
        assert!(err.is_external());
    }

    #[test]
    fn test_retrieval_error_keeps_context() {
        let err = Error::retrieval(
            "hybrid",
            "service_manual_pages",
            "oil capacity",
            Error::external("qdrant", "timeout"),
        );
        let msg = err.to_string();
        assert!(msg.contains("hybrid"));
        assert!(msg.contains("service_manual_pages"));
        assert!(msg.contains("oil capacity"));
        assert!(err.is_external());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_io_with_path() {
        let err = Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/missing",
        );
        assert!(err.to_string().contains("/tmp/missing"));
    }

    #[test]
    fn test_from_serde_json() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
