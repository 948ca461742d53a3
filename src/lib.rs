// Alumni Match - help-request matching over alumni profiles

pub mod config;
pub mod models;
pub mod types;
pub mod llm;
pub mod search;    // Query expansion and ranked retrieval
pub mod embeddings;
pub mod index;     // Vector index contract, fusion and backends
pub mod indexing;
pub mod profiles;
pub mod routes;
pub mod middleware;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
// Note: Import specific items from types module instead of glob to avoid name conflicts
// e.g., use alumni_match::types::{AppError, AppResult};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
