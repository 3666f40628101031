//! HTTP handlers for all web routes.

pub mod dock;
pub mod jobs;
pub mod system;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use vinadock_common::VinadockError;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Internal(#[from] VinadockError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Template(_) | WebError::Internal(_) => {
                error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
