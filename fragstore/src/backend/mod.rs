//! The storage backend contract: put/get/list/delete of opaque blobs keyed
//! by a backend-chosen identifier.
//!
//! A backend may constrain what bytes it is willing to store (a photo host
//! only takes valid images); the wrapper codec in `fragstore_core::codec`
//! exists to satisfy that constraint, not this trait.

pub mod filesystem;
pub mod memory;
pub mod remote;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use filesystem::FileSystem;
pub use memory::Memory;
pub use remote::{Smb, StubCloud};

/// Errors a backend can surface. `Unavailable` is treated as transient and
/// retried by `RetryingBackend`; every other variant is surfaced to the
/// caller immediately.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("no blob stored under key {0:?}")]
    NotFound(String),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Abstract put/get/list/delete contract for a blob store. Implementations
/// must guarantee byte-exact retrieval, a stable identifier once `put`
/// returns, and an idempotent `delete`.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Stores `bytes` and returns the key the backend chose for them.
    async fn put(&self, bytes: Vec<u8>) -> Result<String>;
    /// Retrieves the bytes stored under `key`, byte-exact.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    /// Lists every key currently stored.
    async fn list(&self) -> Result<Vec<String>>;
    /// Deletes the blob under `key`. Deleting a key that is already gone is
    /// not an error.
    async fn delete(&self, key: &str) -> Result<()>;
    /// Soft upper bound on a single blob's size, if the backend has one.
    fn max_blob_size(&self) -> Option<u64> {
        None
    }
}

/// Wraps any `Backend` with bounded exponential backoff on
/// `BackendError::Unavailable`. Every concrete backend only has to
/// implement the raw operations; retry policy lives here once.
#[derive(Debug, Clone)]
pub struct RetryingBackend<B> {
    inner: B,
    max_attempts: u32,
    base_delay: Duration,
}

impl<B: Backend> RetryingBackend<B> {
    pub fn new(inner: B) -> RetryingBackend<B> {
        RetryingBackend {
            inner,
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }

    pub fn with_policy(inner: B, max_attempts: u32, base_delay: Duration) -> RetryingBackend<B> {
        RetryingBackend {
            inner,
            max_attempts,
            base_delay,
        }
    }

    #[instrument(skip(self, op))]
    async fn retry<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(BackendError::Unavailable(msg)) if attempt < self.max_attempts => {
                    let delay = self.base_delay * 2_u32.pow(attempt - 1);
                    warn!(
                        "{} attempt {}/{} failed ({}), retrying in {:?}",
                        op_name, attempt, self.max_attempts, msg, delay
                    );
                    tokio::time::delay_for(delay).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[async_trait]
impl<B: Backend> Backend for RetryingBackend<B> {
    async fn put(&self, bytes: Vec<u8>) -> Result<String> {
        self.retry("put", || {
            let bytes = bytes.clone();
            async { self.inner.put(bytes).await }
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        debug!("fetching {}", key);
        self.retry("get", || async { self.inner.get(key).await })
            .await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.retry("list", || async { self.inner.list().await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.retry("delete", || async { self.inner.delete(key).await })
            .await
    }

    fn max_blob_size(&self) -> Option<u64> {
        self.inner.max_blob_size()
    }
}
