//! The catalog: persistent indices binding compound names, fragment
//! hashes, and resource ids together. Exposes a small transactional
//! key/value contract (§4.9) plus a typed layer on top of it so the
//! assembler, pipeline, and compound manager never touch raw bytes.

pub mod memory;
pub mod sled_catalog;

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use tracing::instrument;

pub use memory::MemoryCatalog;
pub use sled_catalog::SledCatalog;

use fragstore_core::{Compound, Fragment, FragmentHash, Resource, ResourceId};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog I/O error")]
    Io(#[from] std::io::Error),
    #[error("catalog is corrupt: {0}")]
    Corrupt(String),
    #[error("catalog encoding error")]
    Encoding(#[from] bincode::Error),
    #[error("backing store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// A single atomic multi-key write. `commit` either applies every queued
/// put/delete or none of them.
#[async_trait]
pub trait Transaction: Send {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);
    fn delete(&mut self, key: Vec<u8>);
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// The abstract persistent key/value mapping the catalog is built on.
/// Implementations must make `commit` atomic and durable.
#[async_trait]
pub trait Catalog: Send + Sync + std::fmt::Debug {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

const COMPOUND_PREFIX: &[u8] = b"c/";
const FRAGMENT_PREFIX: &[u8] = b"f/";
const RESOURCE_PREFIX: &[u8] = b"r/";
const RESOURCE_FRAGMENTS_PREFIX: &[u8] = b"rf/";

fn compound_key(name: &str) -> Vec<u8> {
    [COMPOUND_PREFIX, name.as_bytes()].concat()
}

fn fragment_key(hash: &FragmentHash) -> Vec<u8> {
    [FRAGMENT_PREFIX, &hash.as_bytes()[..]].concat()
}

fn resource_key(id: &ResourceId) -> Vec<u8> {
    [RESOURCE_PREFIX, id.as_bytes()].concat()
}

fn resource_fragments_key(id: &ResourceId) -> Vec<u8> {
    [RESOURCE_FRAGMENTS_PREFIX, id.as_bytes()].concat()
}

/// Typed front door onto a `Catalog` implementation: serializes
/// `fragstore_core` types with `bincode` and groups the multi-key updates
/// C4/C8 require into single atomic transactions.
#[derive(Debug, Clone)]
pub struct CatalogStore<C> {
    inner: C,
}

impl<C: Catalog> CatalogStore<C> {
    pub fn new(inner: C) -> CatalogStore<C> {
        CatalogStore { inner }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    #[instrument(skip(self))]
    pub async fn get_compound(&self, name: &str) -> Result<Option<Compound>> {
        match self.inner.get(&compound_key(name)).await? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn list_compounds(&self) -> Result<Vec<Compound>> {
        let rows = self.inner.scan_prefix(COMPOUND_PREFIX).await?;
        rows.iter()
            .map(|(_, v)| bincode::deserialize(v).map_err(CatalogError::from))
            .collect()
    }

    pub async fn get_fragment(&self, hash: &FragmentHash) -> Result<Option<Fragment>> {
        match self.inner.get(&fragment_key(hash)).await? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        match self.inner.get(&resource_key(id)).await? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn resource_fragment_hashes(&self, id: &ResourceId) -> Result<HashSet<FragmentHash>> {
        match self.inner.get(&resource_fragments_key(id)).await? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(HashSet::new()),
        }
    }

    /// Retains (or creates at refcount 1) a fragment in a single
    /// transaction; used by the pipeline when a dedup hit lands.
    #[instrument(skip(self, fragment))]
    pub async fn retain_fragment(&self, fragment: Fragment) -> Result<()> {
        let mut txn = self.inner.begin().await?;
        txn.put(
            fragment_key(&fragment.hash),
            bincode::serialize(&fragment)?,
        );
        txn.commit().await
    }

    /// Commits a sealed resource and every fragment it carries in one
    /// atomic transaction, per §4.4(e). `fragments` must already have
    /// their `resource_ref`/`refcount` set by the caller.
    #[instrument(skip(self, resource, fragments))]
    pub async fn commit_resource(&self, resource: Resource, fragments: Vec<Fragment>) -> Result<()> {
        let mut hashes = HashSet::with_capacity(fragments.len());
        let mut txn = self.inner.begin().await?;
        for fragment in &fragments {
            hashes.insert(fragment.hash);
            txn.put(fragment_key(&fragment.hash), bincode::serialize(fragment)?);
        }
        txn.put(
            resource_fragments_key(&resource.id),
            bincode::serialize(&hashes)?,
        );
        txn.put(resource_key(&resource.id), bincode::serialize(&resource)?);
        txn.commit().await
    }

    /// Writes (or overwrites) a compound and the updated refcounts of every
    /// fragment it references, atomically, per §4.8's `upload`. Fragments in
    /// `updated_fragments` that have reached `refcount == 0` (e.g. released
    /// by an overwrite's old sequence) are removed rather than written back,
    /// matching `delete_compound`'s treatment of dead fragments. Returns the
    /// fragments that reached `refcount == 0` (now GC candidates).
    #[instrument(skip(self, compound, updated_fragments))]
    pub async fn commit_compound(
        &self,
        compound: Compound,
        updated_fragments: Vec<Fragment>,
    ) -> Result<Vec<Fragment>> {
        let mut txn = self.inner.begin().await?;
        let mut dead = Vec::new();
        for fragment in updated_fragments {
            if fragment.is_dead() {
                txn.delete(fragment_key(&fragment.hash));
                dead.push(fragment);
            } else {
                txn.put(fragment_key(&fragment.hash), bincode::serialize(&fragment)?);
            }
        }
        txn.put(compound_key(&compound.name), bincode::serialize(&compound)?);
        txn.commit().await?;
        Ok(dead)
    }

    /// Deletes a compound and writes back the decremented refcount of
    /// every fragment it referenced, atomically. Returns the fragments
    /// that reached `refcount == 0` (now GC candidates).
    #[instrument(skip(self, decremented_fragments))]
    pub async fn delete_compound(
        &self,
        name: &str,
        decremented_fragments: Vec<Fragment>,
    ) -> Result<Vec<Fragment>> {
        let mut txn = self.inner.begin().await?;
        txn.delete(compound_key(name));
        let mut dead = Vec::new();
        for fragment in decremented_fragments {
            if fragment.is_dead() {
                txn.delete(fragment_key(&fragment.hash));
                dead.push(fragment);
            } else {
                txn.put(fragment_key(&fragment.hash), bincode::serialize(&fragment)?);
            }
        }
        txn.commit().await?;
        Ok(dead)
    }

    /// Removes a resource and its reverse index once every fragment it
    /// carried is confirmed dead; called only by `clean`.
    #[instrument(skip(self))]
    pub async fn delete_resource(&self, id: &ResourceId) -> Result<()> {
        let mut txn = self.inner.begin().await?;
        txn.delete(resource_key(id));
        txn.delete(resource_fragments_key(id));
        txn.commit().await
    }

    pub async fn all_resources(&self) -> Result<Vec<Resource>> {
        let rows = self.inner.scan_prefix(RESOURCE_PREFIX).await?;
        rows.iter()
            .map(|(_, v)| bincode::deserialize(v).map_err(CatalogError::from))
            .collect()
    }

    pub async fn all_fragments(&self) -> Result<Vec<Fragment>> {
        let rows = self.inner.scan_prefix(FRAGMENT_PREFIX).await?;
        rows.iter()
            .map(|(_, v)| bincode::deserialize(v).map_err(CatalogError::from))
            .collect()
    }

    /// Drops every compound, fragment, resource, and reverse-index row in
    /// one transaction, for `wipe`. Does not touch the backend — callers
    /// that also want `-c` semantics delete backend blobs first, since
    /// those keys are only recoverable from the catalog before it's gone.
    #[instrument(skip(self))]
    pub async fn wipe(&self) -> Result<()> {
        let mut txn = self.inner.begin().await?;
        for prefix in [
            COMPOUND_PREFIX,
            FRAGMENT_PREFIX,
            RESOURCE_PREFIX,
            RESOURCE_FRAGMENTS_PREFIX,
        ] {
            for (key, _) in self.inner.scan_prefix(prefix).await? {
                txn.delete(key);
            }
        }
        txn.commit().await
    }
}
