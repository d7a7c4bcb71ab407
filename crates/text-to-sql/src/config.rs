use analyst_core::FetchOptions;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PRIMARY_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub primary_model: String,
    /// Model used for the retry; `None` retries the primary.
    pub fallback_model: Option<String>,
    pub model_timeout: Duration,
    /// Retries after the first model call (0 or 1).
    pub model_retries: u32,
    pub retry_delay: Duration,
    pub statement_timeout: Duration,
    pub row_limit: usize,
    /// Dialect name given to the model, e.g. "PostgreSQL".
    pub sql_dialect: String,
    pub schema_file: Option<PathBuf>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: Some(DEFAULT_FALLBACK_MODEL.to_string()),
            model_timeout: Duration::from_secs(30),
            model_retries: 1,
            retry_delay: Duration::from_millis(500),
            statement_timeout: Duration::from_secs(10),
            row_limit: 1000,
            sql_dialect: "PostgreSQL".to_string(),
            schema_file: None,
        }
    }
}

impl TranslatorConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let fallback_model = env::var("LLM_FALLBACK_MODEL")
            .unwrap_or_else(|_| DEFAULT_FALLBACK_MODEL.to_string());
        let model_retries: u32 = env::var("LLM_MAX_RETRIES")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("LLM_MAX_RETRIES must be an integer")?;

        Ok(Self {
            primary_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| DEFAULT_PRIMARY_MODEL.to_string()),
            fallback_model: Some(fallback_model.trim().to_string()).filter(|m| !m.is_empty()),
            model_timeout: Duration::from_secs(
                env::var("LLM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("LLM_TIMEOUT_SECS must be an integer")?,
            ),
            model_retries: model_retries.min(1),
            retry_delay: Duration::from_millis(
                env::var("LLM_RETRY_DELAY_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .context("LLM_RETRY_DELAY_MS must be an integer")?,
            ),
            statement_timeout: Duration::from_secs(
                env::var("SQL_STATEMENT_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("SQL_STATEMENT_TIMEOUT_SECS must be an integer")?,
            ),
            row_limit: env::var("SQL_ROW_LIMIT")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("SQL_ROW_LIMIT must be an integer")?,
            sql_dialect: env::var("SQL_DIALECT").unwrap_or_else(|_| "PostgreSQL".to_string()),
            schema_file: env::var("SCHEMA_CONTEXT_FILE")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Models tried in order: the primary, then at most one retry.
    pub fn model_chain(&self) -> Vec<&str> {
        let mut chain = vec![self.primary_model.as_str()];
        if self.model_retries > 0 {
            chain.push(
                self.fallback_model
                    .as_deref()
                    .unwrap_or(self.primary_model.as_str()),
            );
        }
        chain
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            row_limit: self.row_limit,
            statement_timeout: self.statement_timeout,
        }
    }
}
