//! Error types for the query pipeline.

use thiserror::Error;

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can occur while answering a query.
///
/// Every kind is caught at the query-service boundary and rendered as a
/// display string; none of these propagate past [`crate::QueryService`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// Failure talking to the embedding service (network, auth, quota).
    #[error("Embedding service error: {0}")]
    Embedding(String),

    /// Invalid input (empty query, missing tool parameter).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failure in the storage layer (database, missing record, bad file).
    #[error(transparent)]
    Store(#[from] mimir_store::StoreError),

    /// MCP transport or protocol error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        QueryError::Embedding(e.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Internal(e.to_string())
    }
}
