use super::ReconstructionAdapter;
use crate::error::ConvertError;
use bytes::Bytes;
use std::time::Duration;

/// Development backend: emits a minimal glTF-binary container instead of a
/// real reconstruction. The optional delay imitates a slow transform so
/// queueing, timeout and cancellation behavior can be exercised without
/// the real service.
pub struct StubReconstruction {
    delay: Duration,
}

impl StubReconstruction {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for StubReconstruction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReconstructionAdapter for StubReconstruction {
    async fn convert(&self, input: Bytes) -> Result<Bytes, ConvertError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if input.is_empty() {
            return Err(ConvertError::Permanent("empty blueprint image".to_string()));
        }
        Ok(empty_scene_glb())
    }
}

/// Smallest well-formed glTF-binary payload: the 12-byte header plus one
/// JSON chunk holding an empty scene.
fn empty_scene_glb() -> Bytes {
    let mut json = serde_json::json!({
        "asset": { "version": "2.0", "generator": "forgelib-stub" },
        "scenes": [ { "nodes": [] } ],
        "scene": 0,
    })
    .to_string()
    .into_bytes();
    // chunks are padded to 4-byte alignment, JSON chunks with spaces
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = super::GLB_HEADER_LEN + 8 + json.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    Bytes::from(glb)
}
