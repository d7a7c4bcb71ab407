use analyst_core::ModelError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    ServiceUnavailable { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Completion contained no text")]
    EmptyCompletion,
}

pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Convert into the backend-agnostic error, given the timeout the request ran under.
    pub fn into_model_error(self, timeout: Duration) -> ModelError {
        match self {
            LlmError::RequestFailed(e) if e.is_timeout() => ModelError::Timeout(timeout),
            LlmError::RequestFailed(e) => ModelError::Request(e.to_string()),
            LlmError::ServiceUnavailable { status, body } => ModelError::Status { status, body },
            LlmError::InvalidResponse(msg) => ModelError::InvalidResponse(msg),
            LlmError::EmptyCompletion => ModelError::EmptyCompletion,
        }
    }
}
