use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Deserialize;
use text_to_sql::Answer;

use crate::{ApiResponse, AppError, AppState, RequestId};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

pub fn query_routes() -> Router<AppState> {
    Router::new().route("/api/query", post(ask_question))
}

async fn ask_question(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<ApiResponse<Answer>>, AppError> {
    tracing::info!("[{}] Question: {}", request_id.0, request.question.trim());

    let answer = state.translator.run(&request.question).await?;

    tracing::info!(
        "[{}] Returned {} rows from {}",
        request_id.0,
        answer.rows.len(),
        answer.model
    );
    Ok(Json(ApiResponse::success(answer)))
}
