//! Axum router — maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    dock::{api_dock, dock_submit, form_page},
    jobs::{api_job, download_log, download_output, job_page},
    system::health,
};
use crate::sse::job_events;
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_bytes;
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",                  get(form_page))
        .route("/dock",              post(dock_submit))
        .route("/jobs/{id}",         get(job_page))
        .route("/jobs/{id}/output",  get(download_output))
        .route("/jobs/{id}/log",     get(download_log))

        // API endpoints
        .route("/api/dock",          post(api_dock))
        .route("/api/jobs/{id}",     get(api_job))
        .route("/api/health",        get(health))

        // SSE streaming
        .route("/api/events",        get(job_events))

        // Middleware
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
