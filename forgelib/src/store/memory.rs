use super::{Artifact, ArtifactHandle, ArtifactStore};
use crate::error::StoreError;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory artifact storage.
///
/// Not durable: everything is lost when the process exits. Fine for tests
/// and single-node deployments that can tolerate re-uploading after a
/// restart; anything else should use [`super::DiskStore`].
pub struct MemoryStore {
    blobs: Mutex<HashMap<ArtifactHandle, Artifact>>,
    base_url: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_base_url("")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            base_url: base_url.into(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, bytes: Bytes, media_type: &str) -> Result<ArtifactHandle, StoreError> {
        let handle = ArtifactHandle::for_bytes(&bytes);
        let artifact = Artifact {
            bytes,
            media_type: media_type.to_string(),
        };
        self.blobs.lock().unwrap().insert(handle.clone(), artifact);
        Ok(handle)
    }

    async fn get(&self, handle: &ArtifactHandle) -> Result<Artifact, StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn remove(&self, handle: &ArtifactHandle) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().remove(handle);
        Ok(())
    }

    fn url_for(&self, handle: &ArtifactHandle) -> String {
        format!("{}/artifacts/{}", self.base_url, handle.digest())
    }
}
