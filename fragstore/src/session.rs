//! A `Session` is the one long-lived handle this crate exposes to
//! embedders and the CLI: it owns an opened backend, catalog, and resource
//! cache, and hands out a `CompoundManager` to drive every operation
//! through. There is no ambient/global state anywhere in this crate —
//! opening a second `Session` against a different config is always safe,
//! even from the same process.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::{
    Backend, BackendError, FileSystem, Memory, RetryingBackend, Result as BackendResult, Smb,
    StubCloud,
};
use crate::catalog::{
    Catalog, CatalogError, MemoryCatalog, Result as CatalogResult, SledCatalog, Transaction,
};
use crate::compound_manager::CompoundManager;
use crate::config::{BackendConfig, CatalogConfig, ConfigError, FragstoreConfig};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to open backend")]
    Backend(#[from] BackendError),
    #[error("failed to open catalog")]
    Catalog(#[from] CatalogError),
    #[error("I/O error while opening session")]
    Io(#[from] std::io::Error),
    #[error("failed to load configuration")]
    Config(#[from] ConfigError),
}

/// Dispatches to whichever concrete `Backend` the configuration selected.
/// A session's backend kind is a runtime choice, so this enum stands in
/// for the generic parameter `CompoundManager<B, _>` would otherwise need
/// fixed at compile time.
#[derive(Debug)]
pub enum AnyBackend {
    FileSystem(FileSystem),
    Memory(Memory),
    Smb(Smb),
    StubCloud(StubCloud),
}

#[async_trait]
impl Backend for AnyBackend {
    async fn put(&self, bytes: Vec<u8>) -> BackendResult<String> {
        match self {
            AnyBackend::FileSystem(b) => b.put(bytes).await,
            AnyBackend::Memory(b) => b.put(bytes).await,
            AnyBackend::Smb(b) => b.put(bytes).await,
            AnyBackend::StubCloud(b) => b.put(bytes).await,
        }
    }

    async fn get(&self, key: &str) -> BackendResult<Vec<u8>> {
        match self {
            AnyBackend::FileSystem(b) => b.get(key).await,
            AnyBackend::Memory(b) => b.get(key).await,
            AnyBackend::Smb(b) => b.get(key).await,
            AnyBackend::StubCloud(b) => b.get(key).await,
        }
    }

    async fn list(&self) -> BackendResult<Vec<String>> {
        match self {
            AnyBackend::FileSystem(b) => b.list().await,
            AnyBackend::Memory(b) => b.list().await,
            AnyBackend::Smb(b) => b.list().await,
            AnyBackend::StubCloud(b) => b.list().await,
        }
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        match self {
            AnyBackend::FileSystem(b) => b.delete(key).await,
            AnyBackend::Memory(b) => b.delete(key).await,
            AnyBackend::Smb(b) => b.delete(key).await,
            AnyBackend::StubCloud(b) => b.delete(key).await,
        }
    }

    fn max_blob_size(&self) -> Option<u64> {
        match self {
            AnyBackend::FileSystem(b) => b.max_blob_size(),
            AnyBackend::Memory(b) => b.max_blob_size(),
            AnyBackend::Smb(b) => b.max_blob_size(),
            AnyBackend::StubCloud(b) => b.max_blob_size(),
        }
    }
}

async fn open_backend(config: &BackendConfig) -> Result<AnyBackend, SessionError> {
    Ok(match config {
        BackendConfig::Memory => AnyBackend::Memory(Memory::new()),
        BackendConfig::FileSystem { root } => {
            AnyBackend::FileSystem(FileSystem::new(root.clone()).await?)
        }
        BackendConfig::Smb { share } => AnyBackend::Smb(Smb::connect(share)?),
        BackendConfig::StubCloud { endpoint } => {
            AnyBackend::StubCloud(StubCloud::connect(endpoint)?)
        }
    })
}

/// Dispatches to whichever concrete `Catalog` the configuration selected.
#[derive(Debug)]
pub enum AnyCatalog {
    Memory(MemoryCatalog),
    Sled(SledCatalog),
}

#[async_trait]
impl Catalog for AnyCatalog {
    async fn begin(&self) -> CatalogResult<Box<dyn Transaction>> {
        match self {
            AnyCatalog::Memory(c) => c.begin().await,
            AnyCatalog::Sled(c) => c.begin().await,
        }
    }

    async fn get(&self, key: &[u8]) -> CatalogResult<Option<Vec<u8>>> {
        match self {
            AnyCatalog::Memory(c) => c.get(key).await,
            AnyCatalog::Sled(c) => c.get(key).await,
        }
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> CatalogResult<Vec<(Vec<u8>, Vec<u8>)>> {
        match self {
            AnyCatalog::Memory(c) => c.scan_prefix(prefix).await,
            AnyCatalog::Sled(c) => c.scan_prefix(prefix).await,
        }
    }
}

fn open_catalog(config: &CatalogConfig) -> Result<AnyCatalog, SessionError> {
    Ok(match config {
        CatalogConfig::Memory => AnyCatalog::Memory(MemoryCatalog::new()),
        CatalogConfig::Sled { path } => AnyCatalog::Sled(SledCatalog::open(path)?),
    })
}

/// An open session: a backend and catalog pair plus the tuning defaults
/// every upload/download under this session uses unless overridden.
pub struct Session {
    pub manager: CompoundManager<RetryingBackend<AnyBackend>, AnyCatalog>,
    pub config: FragstoreConfig,
}

impl Session {
    /// Opens the backend and catalog named by `config` and wraps them in a
    /// `CompoundManager`. This is the only place in the crate that turns a
    /// config document into live connections.
    pub async fn open(config: FragstoreConfig) -> Result<Session, SessionError> {
        let backend = open_backend(&config.backend).await?;
        let retrying = RetryingBackend::with_policy(
            backend,
            config.retry_attempts,
            std::time::Duration::from_millis(100),
        );
        let catalog = open_catalog(&config.catalog)?;
        let manager = CompoundManager::new(retrying, catalog, config.resource_cache_bytes);
        Ok(Session { manager, config })
    }

    /// Convenience for the common case of opening straight from a config
    /// file path, per §7's load order.
    pub async fn open_from_path(explicit_path: Option<PathBuf>) -> Result<Session, SessionError> {
        let config = FragstoreConfig::load(explicit_path.as_deref())?;
        Session::open(config).await
    }
}
