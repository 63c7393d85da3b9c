//! One blob per file under a root directory, flat namespace of backend
//! keys, with no segment/index bookkeeping — this backend stores opaque
//! resource blobs, not chunks, so there is nothing to index.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::{Backend, BackendError, Result};

#[derive(Debug, Clone)]
pub struct FileSystem {
    root: PathBuf,
}

impl FileSystem {
    /// Opens (creating if necessary) a filesystem backend rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<FileSystem> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(FileSystem { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl Backend for FileSystem {
    async fn put(&self, bytes: Vec<u8>) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        fs::write(self.path_for(&key), &bytes).await?;
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        fs::read(self.path_for(key))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BackendError::NotFound(key.to_string()),
                _ => BackendError::Io(e),
            })
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                out.push(name.to_string());
            }
        }
        Ok(out)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSystem::new(dir.path()).await.unwrap();
        let key = backend.put(b"hello, disk".to_vec()).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), b"hello, disk".to_vec());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSystem::new(dir.path()).await.unwrap();
        let key = backend.put(b"x".to_vec()).await.unwrap();
        backend.delete(&key).await.unwrap();
        backend.delete(&key).await.unwrap();
        assert!(matches!(
            backend.get(&key).await,
            Err(BackendError::NotFound(_))
        ));
    }
}
