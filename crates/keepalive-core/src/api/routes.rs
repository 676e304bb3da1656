//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // URL registry
        .route("/api/get-urls", get(handlers::get_urls))
        .route("/api/add-url", post(handlers::add_url))
        .route("/api/remove-url", post(handlers::remove_url))

        .with_state(state)
}
