use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::core::errors::ApiError;
use crate::planner::SourceDocument;
use crate::search::SearchResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub query: String,
    /// Accepted for client compatibility; planning does not read it.
    #[serde(default)]
    pub user_preferences: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub answer: String,
    pub source_documents: Vec<SourceDocument>,
    pub search_results: Vec<SearchResult>,
    pub status: &'static str,
}

pub async fn plan_dating(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    info!(
        chars = query.chars().count(),
        has_preferences = payload.user_preferences.is_some(),
        "Received planning request"
    );
    let result = state.planner.plan(query).await;

    Ok(Json(PlanResponse {
        answer: result.answer,
        source_documents: result.source_documents,
        search_results: result.search_results,
        status: "success",
    }))
}
