//! API Routes
//!
//! - `GET /health` - liveness plus profile count and active backend
//! - `GET /alumni` - every loaded profile as a card, in load order
//! - `POST /search` - help-request search over the vector index

pub mod alumni;
pub mod health;
pub mod search;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!(backend = state.backend, "Creating application router");
    let origins = state.config.server.cors_allowed_origins.clone();

    Router::new()
        .merge(health::router(state.clone()))
        .merge(alumni::router(state.clone()))
        .merge(search::router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&origins)),
        )
}
