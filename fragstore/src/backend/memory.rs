//! In-process backend: a non-persistent reference implementation used by
//! tests and by `wipe`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Backend, BackendError, Result};

#[derive(Debug, Clone, Default)]
pub struct Memory {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory::default()
    }
}

#[async_trait]
impl Backend for Memory {
    async fn put(&self, bytes: Vec<u8>) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        self.blobs.lock().await.insert(key.clone(), bytes);
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.blobs.lock().await.keys().cloned().collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs.lock().await.remove(key);
        Ok(())
    }
}
