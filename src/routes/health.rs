use axum::{extract::State, response::Json as ResponseJson, routing::get, Json, Router};

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> ResponseJson<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        profiles_indexed: state.profiles.len(),
        backend: state.backend.to_string(),
        search_ready: state.search.is_some(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
