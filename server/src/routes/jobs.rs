use super::ApiError;
use crate::schemas::JobStatusResponse;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use forgelib::error::CancelError;
use std::sync::Arc;
use uuid::Uuid;

pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id = parse_job_id(&id)?;
    let job = state
        .orchestrator
        .status(job_id)
        .map_err(|_| ApiError::NotFound)?;
    let model_url = job
        .output_ref
        .as_ref()
        .map(|handle| state.store.url_for(handle));
    Ok(Json(JobStatusResponse {
        state: job.state,
        model_url,
        error: job.error,
    }))
}

pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let job_id = parse_job_id(&id)?;
    state
        .orchestrator
        .cancel(job_id)
        .await
        .map_err(|err| match err {
            CancelError::NotFound => ApiError::NotFound,
            CancelError::AlreadyFinished => {
                ApiError::Conflict("job already finished".to_string())
            }
        })?;
    Ok(StatusCode::ACCEPTED)
}

fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("not a job id: {raw}")))
}
