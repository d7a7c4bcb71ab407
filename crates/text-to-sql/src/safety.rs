//! Read-only guard for generated SQL.
//!
//! A statement passes only when it is a single query: no trailing second
//! statement, none of the data-modifying keywords anywhere in the text, and
//! a parse tree made of `SELECT`s (optionally under `WITH` or set operations).

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::fmt;

pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "GRANT", "CREATE",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    Empty,
    MultipleStatements,
    ForbiddenKeyword(String),
    Unparseable(String),
    NotAQuery,
    SelectInto,
    LockingClause,
}

impl fmt::Display for SafetyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyViolation::Empty => write!(f, "empty statement"),
            SafetyViolation::MultipleStatements => write!(f, "more than one statement"),
            SafetyViolation::ForbiddenKeyword(keyword) => {
                write!(f, "forbidden keyword {}", keyword)
            }
            SafetyViolation::Unparseable(message) => write!(f, "cannot parse SQL: {}", message),
            SafetyViolation::NotAQuery => write!(f, "statement is not a SELECT query"),
            SafetyViolation::SelectInto => write!(f, "SELECT INTO creates a table"),
            SafetyViolation::LockingClause => write!(f, "row locking clause"),
        }
    }
}

/// Check that `sql` is a single read-only query.
pub fn validate_sql(sql: &str) -> Result<(), SafetyViolation> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(SafetyViolation::Empty);
    }

    if has_trailing_statement(sql) {
        return Err(SafetyViolation::MultipleStatements);
    }

    if let Some(keyword) = FORBIDDEN_KEYWORDS
        .iter()
        .find(|keyword| find_keyword(sql, keyword).is_some())
    {
        return Err(SafetyViolation::ForbiddenKeyword(keyword.to_string()));
    }

    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| SafetyViolation::Unparseable(e.to_string()))?;

    match statements.as_slice() {
        [] => Err(SafetyViolation::Empty),
        [Statement::Query(query)] => check_query(query),
        [_] => Err(SafetyViolation::NotAQuery),
        _ => Err(SafetyViolation::MultipleStatements),
    }
}

/// A `;` followed by anything but whitespace.
fn has_trailing_statement(sql: &str) -> bool {
    sql.match_indices(';')
        .any(|(idx, _)| !sql[idx + 1..].trim().is_empty())
}

fn check_query(query: &Query) -> Result<(), SafetyViolation> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_query(&cte.query)?;
        }
    }
    if !query.locks.is_empty() {
        return Err(SafetyViolation::LockingClause);
    }
    check_set_expr(&query.body)
}

fn check_set_expr(body: &SetExpr) -> Result<(), SafetyViolation> {
    match body {
        SetExpr::Select(select) => {
            if select.into.is_some() {
                Err(SafetyViolation::SelectInto)
            } else {
                Ok(())
            }
        }
        SetExpr::Query(query) => check_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        _ => Err(SafetyViolation::NotAQuery),
    }
}

/// Byte offset of the first case-insensitive whole-word match of `keyword`.
pub(crate) fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let haystack = text.to_ascii_uppercase();
    let needle = keyword.to_ascii_uppercase();
    let bytes = haystack.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';

    haystack.match_indices(&needle).map(|(idx, _)| idx).find(|&idx| {
        let end = idx + needle.len();
        let starts_word = idx == 0 || !is_word(bytes[idx - 1]);
        let ends_word = end == bytes.len() || !is_word(bytes[end]);
        starts_word && ends_word
    })
}
