//! Persistent catalog backed by `sled`. Chosen over a hand-rolled
//! segment-and-index format because this catalog only ever stores
//! metadata — resources are opaque blobs living on the backend, not
//! co-located fragment bytes — so there is no structural reason to
//! hand-roll an on-disk layout. `sled::Batch` +
//! `Tree::apply_batch` gives the atomic multi-key commit §4.9 requires.

use async_trait::async_trait;
use std::path::Path;

use super::{Catalog, CatalogError, Result, Transaction};

#[derive(Debug, Clone)]
pub struct SledCatalog {
    tree: sled::Tree,
}

impl SledCatalog {
    pub fn open(path: impl AsRef<Path>) -> Result<SledCatalog> {
        let db = sled::open(path).map_err(|e| CatalogError::Store(e.to_string()))?;
        Ok(SledCatalog {
            tree: db.open_tree("fragstore_catalog")
                .map_err(|e| CatalogError::Store(e.to_string()))?,
        })
    }
}

struct SledTransaction {
    tree: sled::Tree,
    batch: sled::Batch,
}

#[async_trait]
impl Transaction for SledTransaction {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.batch.insert(key, value);
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.batch.remove(key);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let tree = self.tree;
        let batch = self.batch;
        tokio::task::spawn_blocking(move || tree.apply_batch(batch))
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Catalog for SledCatalog {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(SledTransaction {
            tree: self.tree.clone(),
            batch: sled::Batch::default(),
        }))
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tree = self.tree.clone();
        let key = key.to_vec();
        let value = tokio::task::spawn_blocking(move || tree.get(key))
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let tree = self.tree.clone();
        let prefix = prefix.to_vec();
        tokio::task::spawn_blocking(move || {
            tree.scan_prefix(prefix)
                .map(|entry| entry.map(|(k, v)| (k.to_vec(), v.to_vec())))
                .collect::<std::result::Result<Vec<_>, sled::Error>>()
        })
        .await
        .map_err(|e| CatalogError::Store(e.to_string()))?
        .map_err(|e| CatalogError::Store(e.to_string()))
    }
}
