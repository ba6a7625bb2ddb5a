use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "store_backend": state.store.backend().as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let details = state.planner.status().await;
    Json(json!({
        "status": "ready",
        "details": details,
    }))
}
