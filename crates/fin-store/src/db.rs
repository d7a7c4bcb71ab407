use anyhow::{Context, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::StoreConfig;

const LOCAL_SCHEMA: &str = include_str!("../schema.sql");

/// Backend name reported by sqlx for PostgreSQL connections.
pub(crate) const POSTGRES_BACKEND: &str = "PostgreSQL";

/// Pooled handle to the financial database (PostgreSQL or SQLite).
#[derive(Clone)]
pub struct FinanceDb {
    pool: AnyPool,
}

impl FinanceDb {
    /// Open a bounded connection pool
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to connect to {}", redact_url(&config.database_url)))?;

        tracing::info!(
            "Database pool ready ({}, max {} connections)",
            redact_url(&config.database_url),
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Single-connection in-memory SQLite database with the local schema applied.
    pub async fn in_memory() -> Result<Self> {
        let config = StoreConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..StoreConfig::default()
        };
        let db = Self::connect(&config).await?;
        db.apply_local_schema().await?;
        Ok(db)
    }

    /// Create the tables of `schema.sql` if they are missing (SQLite only).
    pub async fn apply_local_schema(&self) -> Result<()> {
        // sqlx runs one statement per query
        for statement in LOCAL_SCHEMA.split(';') {
            let stmt = strip_comments(statement);
            if !stmt.is_empty() {
                sqlx::query(&stmt)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Failed to apply schema statement: {}", stmt))?;
            }
        }

        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

fn strip_comments(statement: &str) -> String {
    statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Hide the password of a connection URL for logging.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => url.to_string(),
    }
}
