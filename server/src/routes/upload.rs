use super::ApiError;
use crate::schemas::UploadResponse;
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use forgelib::error::SubmitError;
use std::sync::Arc;
use tracing::debug;

/// Accept a blueprint image and queue its conversion.
///
/// Everything that can be rejected is rejected here, before a job or an
/// artifact exists: missing field, empty or oversized payload, bytes that
/// are not a decodable image.
pub async fn upload_blueprint(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("malformed multipart body: {err}")))?
    {
        if field.name() == Some("file") {
            let declared_type = field.content_type().map(str::to_string);
            // a read failure at this point means the body outgrew the limit
            let bytes = field.bytes().await.map_err(|_| ApiError::PayloadTooLarge)?;
            file = Some((bytes, declared_type));
            break;
        }
    }

    let (bytes, declared_type) =
        file.ok_or_else(|| ApiError::BadRequest("missing multipart field \"file\"".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }
    if bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge);
    }
    let media_type = validate_image(&bytes, declared_type.as_deref())?;
    debug!(size = bytes.len(), %media_type, "upload validated");

    let job_id = state
        .orchestrator
        .submit(bytes, &media_type)
        .await
        .map_err(|err| match err {
            SubmitError::Overloaded => ApiError::Overloaded,
            SubmitError::Storage(err) => {
                ApiError::Internal(format!("failed to persist upload: {err}"))
            }
        })?;

    Ok((StatusCode::ACCEPTED, Json(UploadResponse { job_id })))
}

/// The bytes decide the media type; the declared content type is only
/// checked for claiming to be something other than an image.
fn validate_image(bytes: &[u8], declared: Option<&str>) -> Result<String, ApiError> {
    let format = image::guess_format(bytes)
        .map_err(|_| ApiError::BadRequest("file is not a recognized image format".to_string()))?;
    if let Some(declared) = declared {
        if !declared.starts_with("image/") {
            return Err(ApiError::BadRequest(format!(
                "unsupported content type: {declared}"
            )));
        }
    }
    Ok(format.to_mime_type().to_string())
}
