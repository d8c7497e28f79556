pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use axum::{Router, routing::get};
use state::AppState;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/events/", get(handlers::get_event_missing_slug))
        .route("/api/events/{slug}", get(handlers::get_event_by_slug))
        .route("/api/events/{slug}/similar", get(handlers::get_similar_events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
