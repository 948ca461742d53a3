use axum::{extract::State, response::Json as ResponseJson, routing::post, Json, Router};
use tracing::info;

use crate::models::{AlumniResponse, AppState, SearchRequest};
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(search))
        .with_state(state)
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> AppResult<ResponseJson<AlumniResponse>> {
    let query = request.query.trim();
    if query.is_empty() {
        return Ok(Json(AlumniResponse { alumni: Vec::new() }));
    }

    info!(query_chars = query.chars().count(), "Received search request");
    let alumni = state.search()?.search(query).await?;
    Ok(Json(AlumniResponse { alumni }))
}
