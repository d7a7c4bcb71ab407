//! Relationship graph endpoints.
//!
//! A ticker without matching relationships must exist in `companies`,
//! otherwise the request is answered with 404.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use fin_store::{CompanyNetwork, GraphStats, NetworkOptions, RelationshipSet};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct RelationshipQuery {
    #[serde(rename = "type")]
    pub relationship_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkQuery {
    pub depth: Option<u32>,
    pub min_confidence: Option<f64>,
}

pub fn graph_routes() -> Router<AppState> {
    Router::new()
        .route("/api/graph/stats", get(graph_stats))
        .route("/api/graph/:ticker/relationships", get(relationships))
        .route("/api/graph/:ticker/network", get(network))
}

async fn graph_stats(State(state): State<AppState>) -> Result<Json<ApiResponse<GraphStats>>, AppError> {
    Ok(Json(ApiResponse::success(state.graph.stats().await?)))
}

async fn relationships(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<RelationshipQuery>,
) -> Result<Json<ApiResponse<RelationshipSet>>, AppError> {
    let set = state
        .graph
        .find_relationships(&ticker, query.relationship_type.as_deref())
        .await?;

    if set.total == 0 {
        ensure_known(&state, &set.ticker).await?;
    }

    Ok(Json(ApiResponse::success(set)))
}

async fn network(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> Result<Json<ApiResponse<CompanyNetwork>>, AppError> {
    let defaults = NetworkOptions::default();
    let min_confidence = query.min_confidence.unwrap_or(defaults.min_confidence);
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(AppError::bad_request("min_confidence must be between 0 and 1"));
    }

    let options = NetworkOptions {
        depth: query.depth.unwrap_or(defaults.depth),
        min_confidence,
    };
    let network = state.graph.company_network(&ticker, options).await?;

    if network.edges.is_empty() {
        if let Some(root) = network.nodes.first() {
            ensure_known(&state, &root.id).await?;
        }
    }

    Ok(Json(ApiResponse::success(network)))
}

async fn ensure_known(state: &AppState, ticker: &str) -> Result<(), AppError> {
    match state.companies.get_company(ticker).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found(format!("Unknown ticker {}", ticker))),
    }
}
