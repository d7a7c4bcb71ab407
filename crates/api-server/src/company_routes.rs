use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use fin_store::Company;
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

pub fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/api/companies/search", get(search_companies))
        .route("/api/companies/:ticker", get(get_company))
}

async fn search_companies(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<Company>>>, AppError> {
    let companies = state
        .companies
        .search_companies(&query.q, query.limit.unwrap_or(20))
        .await?;

    Ok(Json(ApiResponse::success(companies)))
}

async fn get_company(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<Company>>, AppError> {
    let company = state
        .companies
        .get_company(&ticker)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Unknown ticker {}", ticker.to_uppercase())))?;

    Ok(Json(ApiResponse::success(company)))
}
