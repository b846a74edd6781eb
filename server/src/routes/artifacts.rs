use super::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use forgelib::error::StoreError;
use forgelib::{ArtifactHandle, MODEL_MEDIA_TYPE};
use std::sync::Arc;

/// Serve stored bytes for direct browser download.
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(digest): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = ArtifactHandle::from_digest(&digest).map_err(|_| ApiError::NotFound)?;
    let artifact = state.store.get(&handle).await.map_err(|err| match err {
        StoreError::NotFound => ApiError::NotFound,
        other => ApiError::Internal(format!("failed to read artifact: {other}")),
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&artifact.media_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if artifact.media_type == MODEL_MEDIA_TYPE {
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"model.glb\""),
        );
    }
    Ok((headers, artifact.bytes))
}
