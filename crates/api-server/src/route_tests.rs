use std::sync::Arc;
use std::time::Duration;

use analyst_core::{CompletionModel, ModelError, Prompt};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use fin_store::{FinanceDb, SqlRowSource};
use serde_json::{json, Value};
use text_to_sql::{SchemaContext, TextToSql, TranslatorConfig};
use tower::ServiceExt;

use crate::{build_router, AppState};

/// Always answers with the same completion, or fails when `None`.
struct FixedModel(Option<&'static str>);

#[async_trait]
impl CompletionModel for FixedModel {
    async fn complete(&self, _model: &str, _prompt: &Prompt) -> Result<String, ModelError> {
        match self.0 {
            Some(reply) => Ok(reply.to_string()),
            None => Err(ModelError::Status {
                status: 503,
                body: "upstream unavailable".into(),
            }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "fixed"
    }
}

async fn seeded_db() -> FinanceDb {
    let db = FinanceDb::in_memory().await.unwrap();
    for (ticker, name) in [("AAPL", "Apple Inc."), ("TSM", "Taiwan Semiconductor")] {
        sqlx::query("INSERT INTO companies (ticker, company_name, sector) VALUES ($1, $2, 'Technology')")
            .bind(ticker)
            .bind(name)
            .execute(db.pool())
            .await
            .unwrap();
    }
    sqlx::query(
        "INSERT INTO annual_reports (company_id, fiscal_year, revenue) \
         SELECT id, 2023, 383285000000.0 FROM companies WHERE ticker = 'AAPL'",
    )
    .execute(db.pool())
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO company_relationships \
         (source_company, source_ticker, target_company, target_ticker, relationship_type, confidence) \
         VALUES ('Apple Inc.', 'AAPL', 'Taiwan Semiconductor', 'TSM', 'supplier', 0.9)",
    )
    .execute(db.pool())
    .await
    .unwrap();
    db
}

async fn app(reply: Option<&'static str>) -> Router {
    let db = seeded_db().await;
    let translator = TextToSql::new(
        Arc::new(FixedModel(reply)),
        Arc::new(SqlRowSource::new(&db)),
        SchemaContext::finance(),
        TranslatorConfig {
            retry_delay: Duration::ZERO,
            ..TranslatorConfig::default()
        },
    );
    build_router(AppState::new(translator, db), Duration::from_secs(10))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn ask(question: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/query")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "question": question }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(None).await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["database"], json!("ok"));
}

#[tokio::test]
async fn test_query_returns_rows_and_sql() {
    let sql = "SELECT revenue FROM annual_reports ar JOIN companies c ON ar.company_id = c.id WHERE c.ticker = 'AAPL' AND ar.fiscal_year = 2023";
    let (status, body) = send(app(Some(sql)).await, ask("Apple revenue in 2023?")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sql"], json!(sql));
    assert_eq!(body["data"]["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["truncated"], json!(false));
}

#[tokio::test]
async fn test_unsafe_query_is_422_with_sql() {
    let (status, body) = send(app(Some("DROP TABLE companies")).await, ask("Clean up")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["data"]["code"], json!("unsafe_query"));
    assert_eq!(body["data"]["sql"], json!("DROP TABLE companies"));
}

#[tokio::test]
async fn test_error_status_mapping() {
    let (status, body) = send(app(None).await, ask("Anything")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["code"], json!("model_unavailable"));

    let (status, _) = send(app(Some("SELECT 1")).await, ask("   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(app(Some("SELECT nope FROM companies")).await, ask("Broken")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], json!("query_execution"));
}

#[tokio::test]
async fn test_request_id_and_security_headers() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app(None).await.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
}

#[tokio::test]
async fn test_company_routes() {
    let (status, body) = send(app(None).await, get("/api/companies/aapl")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["company_name"], json!("Apple Inc."));

    let (status, body) = send(app(None).await, get("/api/companies/ZZZZ")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["code"], json!("not_found"));

    let (status, body) = send(app(None).await, get("/api/companies/search?q=semi&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["ticker"], json!("TSM"));
}

#[tokio::test]
async fn test_graph_routes() {
    let (status, body) = send(app(None).await, get("/api/graph/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "companies": 2, "relationships": 1, "documents": 0 }));

    let (status, body) = send(app(None).await, get("/api/graph/TSM/relationships?type=supplier")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["incoming"][0]["source_ticker"], json!("AAPL"));
    assert_eq!(body["data"]["total"], json!(1));

    let (status, body) = send(app(None).await, get("/api/graph/AAPL/network?depth=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["edges"][0]["type"], json!("supplier"));

    let (status, _) = send(app(None).await, get("/api/graph/ZZZZ/network")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(app(None).await, get("/api/graph/AAPL/network?min_confidence=2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
