use analyst_core::{FetchOptions, RowSet, RowSource, SqlParam, StoreError};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;
use sqlx::AnyPool;

use crate::db::{FinanceDb, POSTGRES_BACKEND};
use crate::rows::{decode_json_row, decode_native_row};

/// PostgreSQL SQLSTATE for a statement cancelled by `statement_timeout`.
const QUERY_CANCELED: &str = "57014";

/// Runs one read-only statement inside a scoped transaction.
///
/// The transaction is rolled back on success and dropped (which rolls it
/// back and returns the connection to the pool) on error, timeout or when
/// the caller's future is cancelled. At most `row_limit` rows are pulled
/// from the driver.
#[derive(Clone)]
pub struct SqlRowSource {
    pool: AnyPool,
}

impl SqlRowSource {
    pub fn new(db: &FinanceDb) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    async fn fetch_scoped(
        &self,
        sql: &str,
        params: &[SqlParam],
        options: FetchOptions,
    ) -> Result<RowSet, StoreError> {
        let mut tx = self.pool.begin().await.map_err(pool_error)?;
        let postgres = tx.backend_name() == POSTGRES_BACKEND;

        let statement = if postgres {
            sqlx::query("SET TRANSACTION READ ONLY")
                .execute(&mut *tx)
                .await
                .map_err(|e| database_error(e, options))?;
            let timeout_ms = options.statement_timeout.as_millis().max(1);
            sqlx::query(&format!("SET LOCAL statement_timeout = {}", timeout_ms))
                .execute(&mut *tx)
                .await
                .map_err(|e| database_error(e, options))?;
            // row_to_json covers column types the Any driver cannot decode (NUMERIC, DATE, ...)
            limited_subquery(
                "row_to_json(q)::text AS row_json",
                sql,
                options.row_limit.saturating_add(1),
            )
        } else {
            sql.to_string()
        };

        let mut query = sqlx::query(&statement);
        for param in params {
            query = bind_param(query, param);
        }

        let mut rows = Vec::new();
        let mut truncated = false;
        {
            let mut stream = query.fetch(&mut *tx);
            while let Some(row) = stream
                .try_next()
                .await
                .map_err(|e| database_error(e, options))?
            {
                if rows.len() >= options.row_limit {
                    truncated = true;
                    break;
                }
                rows.push(if postgres {
                    decode_json_row(&row)?
                } else {
                    decode_native_row(&row)?
                });
            }
        }

        tx.rollback().await.map_err(|e| database_error(e, options))?;

        if truncated {
            tracing::warn!("Result truncated to {} rows", options.row_limit);
        }

        Ok(RowSet { rows, truncated })
    }
}

#[async_trait]
impl RowSource for SqlRowSource {
    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[SqlParam],
        options: FetchOptions,
    ) -> Result<RowSet, StoreError> {
        let sql = sql.trim().trim_end_matches(';').trim_end();

        match tokio::time::timeout(
            options.statement_timeout,
            self.fetch_scoped(sql, params, options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Statement exceeded {:?}, abandoning transaction",
                    options.statement_timeout
                );
                Err(StoreError::Timeout(options.statement_timeout))
            }
        }
    }
}

/// Wrap `sql` as a subquery. The inner statement sits on its own lines so a
/// trailing `--` comment cannot swallow the closing parenthesis.
fn limited_subquery(projection: &str, sql: &str, limit: usize) -> String {
    format!(
        "SELECT {} FROM (\n{}\n) AS q LIMIT {}",
        projection, sql, limit
    )
}

fn bind_param<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    param: &SqlParam,
) -> Query<'q, Any, AnyArguments<'q>> {
    match param {
        SqlParam::Null => query.bind(Option::<String>::None),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::Text(v) => query.bind(v.clone()),
    }
}

fn pool_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => {
            StoreError::Pool("timed out waiting for a free connection".to_string())
        }
        sqlx::Error::PoolClosed => StoreError::Pool("connection pool is closed".to_string()),
        other => StoreError::Pool(other.to_string()),
    }
}

fn database_error(err: sqlx::Error, options: FetchOptions) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some(QUERY_CANCELED) {
            return StoreError::Timeout(options.statement_timeout);
        }
        return StoreError::Database(db_err.message().to_string());
    }
    StoreError::Database(err.to_string())
}
