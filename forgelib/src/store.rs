mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque content-addressed reference to stored bytes.
///
/// The SHA-256 digest doubles as the retrieval key, so a handle stays valid
/// across process restarts for any durable backend, and identical uploads
/// collapse onto one stored copy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub(crate) fn for_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Rebuild a handle from its hex digest, e.g. parsed out of a URL path.
    pub fn from_digest(digest: &str) -> Result<Self, StoreError> {
        let well_formed = digest.len() == 64
            && digest
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if well_formed {
            Ok(Self(digest.to_string()))
        } else {
            Err(StoreError::InvalidHandle)
        }
    }

    pub fn digest(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored bytes plus the media type they should be served with.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub bytes: Bytes,
    pub media_type: String,
}

/// Storage for uploaded blueprints and generated models.
///
/// Callers only ever see handles; where and how the bytes live is the
/// backend's business.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    async fn put(&self, bytes: Bytes, media_type: &str) -> Result<ArtifactHandle, StoreError>;

    async fn get(&self, handle: &ArtifactHandle) -> Result<Artifact, StoreError>;

    /// Idempotent: removing a handle that is already gone is not an error.
    async fn remove(&self, handle: &ArtifactHandle) -> Result<(), StoreError>;

    /// Locator a client can GET the artifact from.
    fn url_for(&self, handle: &ArtifactHandle) -> String;
}
