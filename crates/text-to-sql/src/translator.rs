use std::sync::Arc;
use std::time::Instant;

use analyst_core::{CompletionModel, ModelError, Prompt, QueryError, Row, RowSource};
use serde::{Deserialize, Serialize};

use crate::config::TranslatorConfig;
use crate::extract::extract_sql;
use crate::prompt::{build_prompt, SchemaContext};
use crate::safety::validate_sql;

/// Outcome of one translated question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    /// The statement that was executed.
    pub sql: String,
    /// Model that produced the statement.
    pub model: String,
    pub rows: Vec<Row>,
    pub truncated: bool,
}

/// Answers free-text questions by generating, checking and running one SQL query.
///
/// Stateless between calls; safe to share behind an `Arc`.
pub struct TextToSql {
    model: Arc<dyn CompletionModel>,
    store: Arc<dyn RowSource>,
    schema: SchemaContext,
    config: TranslatorConfig,
}

impl TextToSql {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        store: Arc<dyn RowSource>,
        schema: SchemaContext,
        config: TranslatorConfig,
    ) -> Self {
        Self {
            model,
            store,
            schema,
            config,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn schema(&self) -> &SchemaContext {
        &self.schema
    }

    /// Rows answering `question`. An empty result is a valid answer.
    pub async fn answer(&self, question: &str) -> Result<Vec<Row>, QueryError> {
        Ok(self.run(question).await?.rows)
    }

    /// Same pipeline as [`answer`](Self::answer), keeping the SQL and model used.
    pub async fn run(&self, question: &str) -> Result<Answer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::InvalidQuestion(
                "question must not be empty".to_string(),
            ));
        }

        let started = Instant::now();
        tracing::info!("Translating question: {}", question);

        let prompt = build_prompt(&self.schema, &self.config.sql_dialect, question);
        tracing::debug!("Prompt user message: {}", prompt.user);

        let (model, completion) = self.complete_with_fallback(&prompt).await?;

        let sql = extract_sql(&completion).ok_or_else(|| {
            tracing::warn!("No SQL in completion from {}: {}", model, completion);
            QueryError::ModelUnavailable(format!("model {} returned no SQL statement", model))
        })?;
        tracing::debug!("Generated SQL ({}): {}", model, sql);

        if let Err(violation) = validate_sql(&sql) {
            tracing::warn!("Rejected generated SQL ({}): {}", violation, sql);
            return Err(QueryError::UnsafeQuery {
                sql,
                reason: violation.to_string(),
            });
        }

        let statement = sql.trim().trim_end_matches(';').trim_end().to_string();
        let result = self
            .store
            .fetch_rows(&statement, &[], self.config.fetch_options())
            .await
            .map_err(|e| {
                tracing::warn!("Query execution failed: {} -- {}", e, statement);
                QueryError::from(e)
            })?;

        tracing::info!(
            "Answered with {} rows{} in {:?} (model {})",
            result.len(),
            if result.truncated { " (truncated)" } else { "" },
            started.elapsed(),
            model
        );

        Ok(Answer {
            question: question.to_string(),
            sql: statement,
            model,
            rows: result.rows,
            truncated: result.truncated,
        })
    }

    /// Call the primary model, then at most one retry on failure.
    async fn complete_with_fallback(&self, prompt: &Prompt) -> Result<(String, String), QueryError> {
        let chain = self.config.model_chain();
        let mut failures = Vec::with_capacity(chain.len());

        for (attempt, model) in chain.iter().enumerate() {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay).await;
                tracing::warn!("Retrying completion with {}", model);
            }

            let result = match tokio::time::timeout(
                self.config.model_timeout,
                self.model.complete(model, prompt),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ModelError::Timeout(self.config.model_timeout)),
            };

            match result {
                Ok(text) if !text.trim().is_empty() => return Ok((model.to_string(), text)),
                Ok(_) => {
                    tracing::warn!("Model {} returned an empty completion", model);
                    failures.push(format!("{}: {}", model, ModelError::EmptyCompletion));
                }
                Err(e) => {
                    tracing::warn!(
                        "Model {} failed on {} (attempt {}/{}): {}",
                        model,
                        self.model.backend_name(),
                        attempt + 1,
                        chain.len(),
                        e
                    );
                    failures.push(format!("{}: {}", model, e));
                }
            }
        }

        Err(QueryError::ModelUnavailable(failures.join("; ")))
    }
}
