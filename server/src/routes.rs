mod artifacts;
mod jobs;
mod upload;

use crate::schemas::ErrorResponse;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 16 * 1024;

pub fn api_routes(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/upload", post(upload::upload_blueprint))
        .route(
            "/jobs/{id}",
            get(jobs::job_status).delete(jobs::cancel_job),
        )
        .route("/artifacts/{digest}", get(artifacts::download_artifact))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Errors a client can see; each maps to one status code.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PayloadTooLarge,
    NotFound,
    Conflict(String),
    Overloaded,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "upload exceeds the size limit".to_string(),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "no such resource".to_string()),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Overloaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "conversion queue is full, retry later".to_string(),
            ),
            ApiError::Internal(message) => {
                tracing::error!(%message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
