use std::sync::Arc;
use std::time::Duration;

use analyst_core::QueryError;
use anyhow::Context;
use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fin_store::{CompanyDirectory, FinanceDb, RelationshipGraph, SqlRowSource, StoreConfig};
use llm_client::{ChatClient, HttpCompletionModel, LlmConfig};
use serde::Serialize;
use text_to_sql::{SchemaContext, TextToSql, TranslatorConfig};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub mod company_routes;
pub mod config;
pub mod graph_routes;
pub mod query_routes;
mod request_id;
mod security_headers;

#[cfg(test)]
mod route_tests;

pub use config::ServerConfig;
pub use request_id::RequestId;

use company_routes::company_routes;
use graph_routes::graph_routes;
use query_routes::query_routes;

#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<TextToSql>,
    pub companies: CompanyDirectory,
    pub graph: RelationshipGraph,
}

impl AppState {
    pub fn new(translator: TextToSql, db: FinanceDb) -> Self {
        Self {
            translator: Arc::new(translator),
            companies: CompanyDirectory::new(db.clone()),
            graph: RelationshipGraph::new(db),
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error rendered as a failed `ApiResponse`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
    code: &'static str,
    sql: Option<String>,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self {
            status,
            error,
            code: "error",
            sql: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "not_found",
            ..Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!(message.into()))
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "bad_request",
            ..Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<QueryError> for AppError {
    fn from(error: QueryError) -> Self {
        let status = match &error {
            QueryError::InvalidQuestion(_) | QueryError::QueryExecution(_) => {
                StatusCode::BAD_REQUEST
            }
            QueryError::UnsafeQuery { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            QueryError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            code: error.code(),
            sql: error.rejected_sql().map(str::to_string),
            error: error.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed ({}): {:#}", self.status, self.error);
        } else {
            tracing::warn!("Request rejected ({}): {:#}", self.status, self.error);
        }

        let body = ApiResponse {
            success: false,
            data: Some(ErrorDetail {
                code: self.code,
                sql: self.sql,
            }),
            error: Some(format!("{:#}", self.error)),
        };
        (self.status, Json(body)).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let database = match state.graph.stats().await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check database probe failed: {:#}", e);
            "unavailable"
        }
    };

    Json(ApiResponse::success(serde_json::json!({
        "status": "ok",
        "service": "fin-analyst-api",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    })))
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/health", get(health))
        .merge(query_routes())
        .merge(company_routes())
        .merge(graph_routes())
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(trace)
        .layer(cors)
        .with_state(state)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Cannot install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received Ctrl+C");
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let server_config = ServerConfig::from_env()?;
    let store_config = StoreConfig::from_env()?;
    let translator_config = TranslatorConfig::from_env()?;
    let llm_config = LlmConfig::from_env()?;

    let db = FinanceDb::connect(&store_config).await?;
    if store_config.database_url.starts_with("sqlite:") {
        db.apply_local_schema().await?;
    }

    let schema = match &translator_config.schema_file {
        Some(path) => SchemaContext::from_file(path)?,
        None => SchemaContext::finance(),
    };

    tracing::info!(
        "Text-to-SQL models: {} (fallback: {})",
        translator_config.primary_model,
        translator_config.fallback_model.as_deref().unwrap_or("none")
    );

    let model = HttpCompletionModel::new(ChatClient::new(llm_config)?);
    let translator = TextToSql::new(
        Arc::new(model),
        Arc::new(SqlRowSource::new(&db)),
        schema,
        translator_config,
    );

    let app = build_router(AppState::new(translator, db), server_config.request_timeout);

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("API server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("API server stopped");
    Ok(())
}
