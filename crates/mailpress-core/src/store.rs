//! Raw message blob storage.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::{Error, Result};

/// Read-only access to raw message blobs, keyed by content key.
pub trait ContentStore {
    /// Fetch the raw bytes behind a content key.
    fn fetch(&self, content_key: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// List every known content key.
    fn list(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Content store backed by a directory of files; the content key is
/// the path relative to the root.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, content_key: &str) -> Result<PathBuf> {
        // Keys are storage identifiers, never user paths.
        if content_key.contains("..") || content_key.starts_with('/') {
            return Err(Error::Storage(format!(
                "invalid content key: {content_key}"
            )));
        }
        Ok(self.root.join(content_key))
    }
}

impl ContentStore for FsContentStore {
    async fn fetch(&self, content_key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(content_key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Storage(format!("fetch {content_key}: {e}")))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory content store for tests.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a blob.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn put(&self, content_key: &str, bytes: impl Into<Vec<u8>>) {
        #[allow(clippy::unwrap_used)]
        self.blobs
            .lock()
            .unwrap()
            .insert(content_key.to_string(), bytes.into());
    }
}

impl ContentStore for MemoryContentStore {
    async fn fetch(&self, content_key: &str) -> Result<Vec<u8>> {
        #[allow(clippy::unwrap_used)]
        self.blobs
            .lock()
            .unwrap()
            .get(content_key)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("no blob for content key: {content_key}")))
    }

    async fn list(&self) -> Result<Vec<String>> {
        #[allow(clippy::unwrap_used)]
        Ok(self.blobs.lock().unwrap().keys().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_fetch_and_list() {
        let store = MemoryContentStore::new();
        store.put("inbox/b", b"beta".to_vec());
        store.put("inbox/a", b"alpha".to_vec());

        assert_eq!(store.fetch("inbox/a").await.unwrap(), b"alpha");
        assert_eq!(store.list().await.unwrap(), vec!["inbox/a", "inbox/b"]);
    }

    #[tokio::test]
    async fn test_memory_store_missing_key() {
        let store = MemoryContentStore::new();
        let err = store.fetch("inbox/nope").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_fs_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("mailpress-store-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("msg-1"), b"raw bytes").await.unwrap();

        let store = FsContentStore::new(&dir);
        assert_eq!(store.fetch("msg-1").await.unwrap(), b"raw bytes");
        assert!(store.list().await.unwrap().contains(&"msg-1".to_string()));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_store_rejects_traversal() {
        let store = FsContentStore::new("/tmp");
        assert!(store.fetch("../etc/passwd").await.is_err());
        assert!(store.fetch("/etc/passwd").await.is_err());
    }
}
