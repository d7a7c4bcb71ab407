pub mod chat;
pub mod error;
pub mod provider;

pub use chat::ChatClient;
pub use error::{LlmError, LlmResult};
pub use provider::HttpCompletionModel;

use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the hosted chat-completions endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    /// Left unset by default: some models only accept their built-in temperature.
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 1024,
            temperature: None,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let timeout_secs: u64 = std::env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("LLM_TIMEOUT_SECS must be an integer")?;

        let temperature = match std::env::var("LLM_TEMPERATURE") {
            Ok(v) if !v.trim().is_empty() => {
                Some(v.trim().parse().context("LLM_TEMPERATURE must be a number")?)
            }
            _ => None,
        };

        Ok(Self {
            api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(timeout_secs),
            max_tokens: std::env::var("LLM_MAX_TOKENS")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .context("LLM_MAX_TOKENS must be an integer")?,
            temperature,
        })
    }
}
