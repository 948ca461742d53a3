use axum::{extract::State, response::Json as ResponseJson, routing::get, Json, Router};
use tracing::debug;

use crate::models::{AlumniResponse, AppState};
use crate::search::service::list_profiles;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/alumni", get(list_alumni))
        .with_state(state)
}

/// Directory listing; does not need the search index
async fn list_alumni(State(state): State<AppState>) -> ResponseJson<AlumniResponse> {
    let alumni = list_profiles(&state.profiles);
    debug!(count = alumni.len(), "Listing alumni");
    Json(AlumniResponse { alumni })
}
