use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Largest accepted chunk upload
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Ingestion
        .route("/create-visit", post(handlers::create_visit))
        .route("/upload-chunk/:visit_id", post(handlers::upload_chunk))
        .route("/visits/:visit_id/reopen", post(handlers::reopen_visit))
        // Progress queries
        .route("/status/:visit_id", get(handlers::get_status))
        .route("/report/:visit_id", get(handlers::get_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
