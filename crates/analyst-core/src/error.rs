use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the question answering pipeline.
///
/// The three failure kinds of a translation (`ModelUnavailable`,
/// `UnsafeQuery`, `QueryExecution`) are propagated to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Unsafe query rejected ({reason}): {sql}")]
    UnsafeQuery { sql: String, reason: String },

    #[error("Query execution failed: {0}")]
    QueryExecution(String),
}

impl QueryError {
    /// Short machine-readable code, used by the HTTP layer and in logs.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidQuestion(_) => "invalid_question",
            QueryError::ModelUnavailable(_) => "model_unavailable",
            QueryError::UnsafeQuery { .. } => "unsafe_query",
            QueryError::QueryExecution(_) => "query_execution",
        }
    }

    /// The rejected SQL text, if this is a safety rejection.
    pub fn rejected_sql(&self) -> Option<&str> {
        match self {
            QueryError::UnsafeQuery { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// Failure of a single hosted-model call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Empty completion")]
    EmptyCompletion,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Failure of a store access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cannot decode column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::QueryExecution(err.to_string())
    }
}
