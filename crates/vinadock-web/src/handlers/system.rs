//! Service health and Vina availability.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let runner = state.jobs.runner();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "vina_path": runner.executable_path().display().to_string(),
        "vina_found": runner.is_available(),
        "jobs": state.jobs.len().await,
    }))
}
