//! The fragment pipeline (C6): chunk a stream at a fixed size, apply the
//! first-layer encapsulation, hash the result, and either retain an
//! existing catalog fragment or hand new bytes to the pending buffer (C7).
//!
//! Two different compounds only dedup against each other if they agree on
//! `fragment_size` and first-layer encapsulation — chunk size is fixed per
//! compound, variable chunking being an explicit non-goal.

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;

use fragstore_core::codec::{EncapsulationError, EncapsulationSpec};
use fragstore_core::{Fragment, FragmentHash, Resource};

use crate::assembler::{AssemblerError, ResourceBuilder};
use crate::backend::{Backend, BackendError};
use crate::cache::FragmentCache;
use crate::catalog::{Catalog, CatalogError, CatalogStore};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("encapsulation error while ingesting a fragment")]
    Encapsulation(#[from] EncapsulationError),
    #[error("catalog error during dedup lookup")]
    Catalog(#[from] CatalogError),
    #[error("assembler error while sealing a resource")]
    Assembler(#[from] AssemblerError),
    #[error("backend error")]
    Backend(#[from] BackendError),
}

/// A resource sealed by a flush, paired with the fragments it carries.
pub struct FlushedResource {
    pub resource: Resource,
    pub fragments: Vec<Fragment>,
}

/// Chunks a stream, dedups each resulting fragment against the catalog,
/// and buffers new fragment bodies until one of §4.7's flush thresholds is
/// met, at which point it seals a resource through the assembler.
pub struct Pipeline {
    cache: FragmentCache,
    pending_refcounts: HashMap<FragmentHash, u64>,
}

impl Pipeline {
    pub fn new(target_resource_size: u64, max_fragments_per_resource: usize) -> Pipeline {
        Pipeline {
            cache: FragmentCache::new(target_resource_size, max_fragments_per_resource),
            pending_refcounts: HashMap::new(),
        }
    }

    /// Processes one already-sliced chunk: applies the first-layer spec,
    /// hashes it, and either retains an existing fragment or buffers a new
    /// one. Returns the hash to append to the compound's fragment sequence.
    #[instrument(skip(self, catalog, raw_chunk, first_layer_spec))]
    pub async fn ingest_chunk<C: Catalog>(
        &mut self,
        catalog: &CatalogStore<C>,
        raw_chunk: Vec<u8>,
        first_layer_spec: &EncapsulationSpec,
    ) -> Result<FragmentHash, PipelineError> {
        let encapsulated = fragstore_core::codec::apply(first_layer_spec, raw_chunk)?;
        let hash = FragmentHash::of(&encapsulated);

        if let Some(mut fragment) = catalog.get_fragment(&hash).await? {
            fragment.retain();
            catalog.retain_fragment(fragment).await?;
        } else if let Some(count) = self.pending_refcounts.get_mut(&hash) {
            *count += 1;
        } else {
            self.pending_refcounts.insert(hash, 1);
            self.cache.push(hash, encapsulated);
        }
        Ok(hash)
    }

    pub fn should_flush(&self) -> bool {
        self.cache.should_flush()
    }

    pub fn has_pending(&self) -> bool {
        !self.cache.is_empty()
    }

    /// Seals whatever is currently buffered into a resource. Returns
    /// `None` if nothing is pending. On upload failure, buffered fragments
    /// are simply dropped from this pipeline's bookkeeping (per §4.4, a
    /// half-built resource whose upload fails is discarded and its
    /// fragments are not committed anywhere); the caller is expected to
    /// retry the whole compound upload on the next attempt.
    #[instrument(skip(self, backend, catalog, second_layer_spec))]
    pub async fn flush<B: Backend, C: Catalog>(
        &mut self,
        backend: &B,
        catalog: &CatalogStore<C>,
        second_layer_spec: EncapsulationSpec,
    ) -> Result<Option<FlushedResource>, PipelineError> {
        if self.cache.is_empty() {
            return Ok(None);
        }
        let pending = self.cache.drain();
        let mut builder = ResourceBuilder::open();
        let mut refcounts = HashMap::with_capacity(pending.len());
        for fragment in pending {
            let count = self.pending_refcounts.remove(&fragment.hash).unwrap_or(1);
            refcounts.insert(fragment.hash, count);
            builder.append(fragment.hash, fragment.body);
        }
        let (resource, fragments) = builder
            .seal(backend, catalog, second_layer_spec, &refcounts)
            .await?;
        Ok(Some(FlushedResource { resource, fragments }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Memory;
    use crate::catalog::MemoryCatalog;
    use fragstore_core::codec::{Layer, Wrapper};
    use fragstore_core::Compression;

    fn identity_spec() -> EncapsulationSpec {
        vec![
            Layer::Compress(Compression::NoCompression),
            Layer::Wrap(Wrapper::Identity),
        ]
    }

    #[tokio::test]
    async fn repeated_chunk_within_same_flush_gets_refcount_two() {
        let backend = Memory::new();
        let catalog = CatalogStore::new(MemoryCatalog::new());
        let mut pipeline = Pipeline::new(u64::MAX, 100);

        let h1 = pipeline
            .ingest_chunk(&catalog, b"same".to_vec(), &identity_spec())
            .await
            .unwrap();
        let h2 = pipeline
            .ingest_chunk(&catalog, b"same".to_vec(), &identity_spec())
            .await
            .unwrap();
        assert_eq!(h1, h2);

        let flushed = pipeline
            .flush(&backend, &catalog, identity_spec())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flushed.fragments.len(), 1);
        assert_eq!(flushed.fragments[0].refcount, 2);
    }

    #[tokio::test]
    async fn dedup_against_existing_catalog_fragment_retains_without_buffering() {
        let backend = Memory::new();
        let catalog = CatalogStore::new(MemoryCatalog::new());
        let mut first = Pipeline::new(u64::MAX, 100);
        first
            .ingest_chunk(&catalog, b"dup".to_vec(), &identity_spec())
            .await
            .unwrap();
        first
            .flush(&backend, &catalog, identity_spec())
            .await
            .unwrap();

        let mut second = Pipeline::new(u64::MAX, 100);
        second
            .ingest_chunk(&catalog, b"dup".to_vec(), &identity_spec())
            .await
            .unwrap();
        assert!(!second.has_pending());

        let hash = FragmentHash::of(b"dup");
        let fragment = catalog.get_fragment(&hash).await.unwrap().unwrap();
        assert_eq!(fragment.refcount, 2);
    }
}
