use super::{Artifact, ArtifactHandle, ArtifactStore};
use crate::error::StoreError;
use bytes::Bytes;
use std::io;
use std::path::PathBuf;
use tokio::fs;

/// Artifact storage backed by digest-named files in a single directory.
///
/// Bytes land in `<dir>/<digest>` and the media type in a
/// `<dir>/<digest>.media` sidecar, so handles survive process restarts.
pub struct DiskStore {
    dir: PathBuf,
    base_url: String,
}

impl DiskStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(
        dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            base_url: base_url.into(),
        })
    }

    fn blob_path(&self, handle: &ArtifactHandle) -> PathBuf {
        self.dir.join(handle.digest())
    }

    fn media_path(&self, handle: &ArtifactHandle) -> PathBuf {
        self.dir.join(format!("{}.media", handle.digest()))
    }
}

#[async_trait::async_trait]
impl ArtifactStore for DiskStore {
    async fn put(&self, bytes: Bytes, media_type: &str) -> Result<ArtifactHandle, StoreError> {
        let handle = ArtifactHandle::for_bytes(&bytes);
        fs::write(self.blob_path(&handle), &bytes).await?;
        fs::write(self.media_path(&handle), media_type.as_bytes()).await?;
        Ok(handle)
    }

    async fn get(&self, handle: &ArtifactHandle) -> Result<Artifact, StoreError> {
        let bytes = match fs::read(self.blob_path(handle)).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(err) => return Err(err.into()),
        };
        // a missing sidecar degrades to a generic media type
        let media_type = fs::read_to_string(self.media_path(handle))
            .await
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Ok(Artifact { bytes, media_type })
    }

    async fn remove(&self, handle: &ArtifactHandle) -> Result<(), StoreError> {
        for path in [self.blob_path(handle), self.media_path(handle)] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn url_for(&self, handle: &ArtifactHandle) -> String {
        format!("{}/artifacts/{}", self.base_url, handle.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(dir.path(), "").await.expect("open");
        let handle = store
            .put(Bytes::from_static(b"model bytes"), "model/gltf-binary")
            .await
            .expect("put");
        let artifact = store.get(&handle).await.expect("get");
        assert_eq!(&artifact.bytes[..], b"model bytes");
        assert_eq!(artifact.media_type, "model/gltf-binary");
    }

    #[tokio::test]
    async fn contents_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let handle = {
            let store = DiskStore::open(dir.path(), "").await.expect("open");
            store
                .put(Bytes::from_static(b"durable bytes"), "image/png")
                .await
                .expect("put")
        };
        let reopened = DiskStore::open(dir.path(), "").await.expect("reopen");
        let artifact = reopened.get(&handle).await.expect("get after reopen");
        assert_eq!(&artifact.bytes[..], b"durable bytes");
    }

    #[tokio::test]
    async fn identical_bytes_share_one_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(dir.path(), "").await.expect("open");
        let first = store
            .put(Bytes::from_static(b"same"), "image/png")
            .await
            .expect("put");
        let second = store
            .put(Bytes::from_static(b"same"), "image/png")
            .await
            .expect("put again");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_handle_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(dir.path(), "").await.expect("open");
        let handle = ArtifactHandle::for_bytes(b"never stored");
        assert!(matches!(store.get(&handle).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(dir.path(), "").await.expect("open");
        let handle = store
            .put(Bytes::from_static(b"short lived"), "image/png")
            .await
            .expect("put");
        store.remove(&handle).await.expect("first remove");
        store.remove(&handle).await.expect("second remove");
        assert!(matches!(store.get(&handle).await, Err(StoreError::NotFound)));
    }
}
