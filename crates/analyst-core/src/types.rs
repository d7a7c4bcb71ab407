use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One result row: column name to value, in select-list order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Rows returned by a single statement, capped at the requested row limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub rows: Vec<Row>,
    /// True when the statement produced more rows than the limit allowed.
    pub truncated: bool,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Positional statement parameter (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Float(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

/// Bounds applied to one statement execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchOptions {
    pub row_limit: usize,
    pub statement_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            row_limit: 1000,
            statement_timeout: Duration::from_secs(10),
        }
    }
}

/// Chat prompt sent to a hosted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}
