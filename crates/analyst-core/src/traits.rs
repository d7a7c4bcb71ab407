use async_trait::async_trait;
use crate::{FetchOptions, ModelError, Prompt, RowSet, SqlParam, StoreError};

/// A hosted chat-completion model reachable under several model names.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Run one completion against `model` and return the raw text.
    async fn complete(&self, model: &str, prompt: &Prompt) -> Result<String, ModelError>;

    fn backend_name(&self) -> &'static str;
}

/// Executes a single read-only statement and returns its rows.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[SqlParam],
        options: FetchOptions,
    ) -> Result<RowSet, StoreError>;
}
