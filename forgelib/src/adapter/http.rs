use super::ReconstructionAdapter;
use crate::error::ConvertError;
use bytes::Bytes;
use reqwest::StatusCode;

/// Adapter for a remote reconstruction service.
///
/// The service receives the raw blueprint bytes in a POST body and answers
/// with the model bytes. Connection problems, 429 and 5xx responses are
/// transient; other 4xx responses mean the service rejected this blueprint
/// for good. A malformed model body counts as transient, since the service
/// is expected to produce a usable model when asked to regenerate.
pub struct HttpReconstruction {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReconstruction {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl ReconstructionAdapter for HttpReconstruction {
    async fn convert(&self, input: Bytes) -> Result<Bytes, ConvertError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(input)
            .send()
            .await
            .map_err(|err| {
                ConvertError::Transient(format!("reconstruction service unreachable: {err}"))
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(ConvertError::Transient(format!(
                "reconstruction service answered {status}"
            )));
        }
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ConvertError::Permanent(format!(
                "reconstruction service rejected the blueprint ({status}): {detail}"
            )));
        }

        let model = response.bytes().await.map_err(|err| {
            ConvertError::Transient(format!("reconstruction response truncated: {err}"))
        })?;
        if model.len() < super::GLB_HEADER_LEN || &model[..4] != b"glTF" {
            return Err(ConvertError::Transient(
                "reconstruction service returned a malformed model".to_string(),
            ));
        }
        Ok(model)
    }
}
