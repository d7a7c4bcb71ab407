use analyst_core::{Row, StoreError};
use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::{Column, Row as _};

/// Decode a row column by column, trying the value kinds the `Any` driver exposes.
pub(crate) fn decode_native_row(row: &AnyRow) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, idx).map_err(|message| StoreError::Decode {
            column: column.name().to_string(),
            message,
        })?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

/// Decode a row produced by `SELECT row_to_json(q)::text ...`.
pub(crate) fn decode_json_row(row: &AnyRow) -> Result<Row, StoreError> {
    let text: Option<String> = row.try_get(0).map_err(|e| StoreError::Decode {
        column: "row_json".to_string(),
        message: e.to_string(),
    })?;

    match text.as_deref().map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => Ok(map),
        Some(Ok(other)) => Err(StoreError::Decode {
            column: "row_json".to_string(),
            message: format!("expected a JSON object, got {}", other),
        }),
        Some(Err(e)) => Err(StoreError::Decode {
            column: "row_json".to_string(),
            message: e.to_string(),
        }),
        None => Ok(Row::new()),
    }
}

fn decode_value(row: &AnyRow, idx: usize) -> Result<Value, String> {
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return Ok(v.map(Value::Bool).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(v.map(Value::from).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        // NaN and infinities have no JSON form
        return Ok(v
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return Ok(v.map(Value::String).unwrap_or(Value::Null));
    }
    match row.try_get::<Option<Vec<u8>>, _>(idx) {
        Ok(v) => Ok(v.map(|bytes| Value::String(hex::encode(bytes))).unwrap_or(Value::Null)),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FinanceDb;
    use serde_json::json;

    #[tokio::test]
    async fn test_decode_native_types() {
        let db = FinanceDb::in_memory().await.unwrap();
        let row = sqlx::query(
            "SELECT 42 AS answer, 1.5 AS ratio, 'AAPL' AS ticker, NULL AS missing, x'beef' AS raw",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();

        let decoded = decode_native_row(&row).unwrap();
        assert_eq!(decoded["answer"], json!(42));
        assert_eq!(decoded["ratio"], json!(1.5));
        assert_eq!(decoded["ticker"], json!("AAPL"));
        assert_eq!(decoded["missing"], Value::Null);
        assert_eq!(decoded["raw"], json!("beef"));

        let columns: Vec<&str> = decoded.keys().map(|k| k.as_str()).collect();
        assert_eq!(columns, vec!["answer", "ratio", "ticker", "missing", "raw"]);
    }

    #[tokio::test]
    async fn test_decode_json_row() {
        let db = FinanceDb::in_memory().await.unwrap();
        let row = sqlx::query(r#"SELECT '{"ticker":"MSFT","revenue":211915000000}' AS row_json"#)
            .fetch_one(db.pool())
            .await
            .unwrap();

        let decoded = decode_json_row(&row).unwrap();
        assert_eq!(decoded["ticker"], json!("MSFT"));
        assert_eq!(decoded["revenue"], json!(211915000000_i64));
    }

    #[tokio::test]
    async fn test_decode_json_row_rejects_non_object() {
        let db = FinanceDb::in_memory().await.unwrap();
        let row = sqlx::query("SELECT '[1,2]' AS row_json")
            .fetch_one(db.pool())
            .await
            .unwrap();

        assert!(matches!(decode_json_row(&row), Err(StoreError::Decode { .. })));
    }
}
