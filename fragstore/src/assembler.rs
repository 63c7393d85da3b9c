//! The resource assembler (C4): packs ordered fragment bodies into one
//! resource body, applies the second-layer compress-then-wrap, uploads via
//! the backend, and commits the result to the catalog in one transaction.
//!
//! A half-built resource whose upload fails is discarded outright — no
//! catalog entries are written, and the caller is expected to return the
//! fragments to the pending queue for the next builder.

use thiserror::Error;
use tracing::{instrument, warn};

use fragstore_core::codec::{EncapsulationError, EncapsulationSpec};
use fragstore_core::format::{self, FormatError, FramedFragment};
use fragstore_core::{Fragment, FragmentHash, FragmentLayoutEntry, FragmentRef, Resource, ResourceId};

use crate::backend::{Backend, BackendError};
use crate::catalog::{Catalog, CatalogError, CatalogStore};

#[derive(Error, Debug)]
pub enum AssemblerError {
    #[error("backend error while uploading resource")]
    Backend(#[from] BackendError),
    #[error("encapsulation error while sealing resource")]
    Encapsulation(#[from] EncapsulationError),
    #[error("resource format error")]
    Format(#[from] FormatError),
    #[error("catalog error while committing resource")]
    Catalog(#[from] CatalogError),
}

/// Accumulates fragment bodies for a single resource. `ResourceId` is
/// assigned on `open`, not on `seal`, so callers can learn the id a resource
/// will commit under before any bytes are uploaded.
pub struct ResourceBuilder {
    id: ResourceId,
    fragments: Vec<(FragmentHash, Vec<u8>)>,
    accumulated_bytes: u64,
}

impl ResourceBuilder {
    pub fn open() -> ResourceBuilder {
        ResourceBuilder {
            id: ResourceId::random(),
            fragments: Vec::new(),
            accumulated_bytes: 0,
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        self.id
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn accumulated_size(&self) -> u64 {
        self.accumulated_bytes
    }

    /// Buffers a fragment body for this resource. Its real offset inside
    /// the framed inner payload is only known once `seal` runs the actual
    /// framing, so nothing is returned here.
    pub fn append(&mut self, hash: FragmentHash, body: Vec<u8>) {
        self.accumulated_bytes += body.len() as u64;
        self.fragments.push((hash, body));
    }

    /// Frames, compresses, wraps, uploads, and commits this builder's
    /// fragments as one resource. Returns the committed `Resource` and the
    /// `Fragment` records now live in the catalog.
    #[instrument(skip(self, backend, catalog, initial_refcounts))]
    pub async fn seal<B: Backend, C: Catalog>(
        self,
        backend: &B,
        catalog: &CatalogStore<C>,
        encapsulation_spec: EncapsulationSpec,
        initial_refcounts: &std::collections::HashMap<FragmentHash, u64>,
    ) -> Result<(Resource, Vec<Fragment>), AssemblerError> {
        let id = self.id;
        let framed: Vec<FramedFragment> = self
            .fragments
            .into_iter()
            .map(|(hash, body)| FramedFragment { hash, body })
            .collect();

        let (compressor_id, wrapper_id) = codec_ids(&encapsulation_spec);
        let inner_payload = format::encode(compressor_id, wrapper_id, &framed)?;
        // The framed layout's offsets account for the header and the
        // per-fragment hash/length prefixes, so they are computed from the
        // encoded bytes rather than from a bare concatenation of bodies —
        // this is what lets `download` slice a fetched resource directly
        // without re-parsing the header.
        let header = format::decode_header(&inner_payload)?;
        let layout: Vec<FragmentLayoutEntry> = header
            .layout
            .into_iter()
            .map(|(hash, offset, length)| FragmentLayoutEntry {
                hash,
                offset,
                length,
            })
            .collect();

        let encapsulated = fragstore_core::codec::apply(&encapsulation_spec, inner_payload)?;
        let total_size = encapsulated.len() as u64;

        let upload = backend.put(encapsulated).await;
        let backend_key = match upload {
            Ok(key) => key,
            Err(e) => {
                warn!("resource {:?} upload failed, discarding builder: {}", id, e);
                return Err(AssemblerError::Backend(e));
            }
        };

        let resource = Resource {
            id,
            backend_key,
            fragment_layout: layout,
            wrapper_spec: encapsulation_spec,
            total_size,
        };

        let fragments: Vec<Fragment> = resource
            .fragment_layout
            .iter()
            .map(|entry| {
                let mut fragment = Fragment::new(
                    entry.hash,
                    entry.length,
                    FragmentRef {
                        resource_id: id,
                        offset: entry.offset,
                        length: entry.length,
                    },
                );
                if let Some(&count) = initial_refcounts.get(&entry.hash) {
                    fragment.refcount = count;
                }
                fragment
            })
            .collect();

        catalog
            .commit_resource(resource.clone(), fragments.clone())
            .await?;

        Ok((resource, fragments))
    }
}

/// Resolves an encapsulation spec to the `(compressor_id, wrapper_id)` pair
/// the resource's inner-format header records.
fn codec_ids(spec: &EncapsulationSpec) -> (u8, u8) {
    use fragstore_core::codec::Layer;
    let mut compressor_id = 0;
    let mut wrapper_id = 0;
    for layer in spec {
        match layer {
            Layer::Compress(c) => compressor_id = c.wire_tag(),
            Layer::Wrap(w) => wrapper_id = w.wire_tag(),
        }
    }
    (compressor_id, wrapper_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Memory;
    use crate::catalog::MemoryCatalog;
    use fragstore_core::codec::{Layer, Wrapper};
    use fragstore_core::Compression;

    #[tokio::test]
    async fn seal_uploads_and_commits_fragments() {
        let backend = Memory::new();
        let catalog = CatalogStore::new(MemoryCatalog::new());
        let mut builder = ResourceBuilder::open();
        let h1 = FragmentHash::of(b"one");
        let h2 = FragmentHash::of(b"two");
        builder.append(h1, b"one".to_vec());
        builder.append(h2, b"two".to_vec());

        let spec = vec![
            Layer::Compress(Compression::NoCompression),
            Layer::Wrap(Wrapper::Identity),
        ];
        let (resource, fragments) = builder
            .seal(&backend, &catalog, spec, &std::collections::HashMap::new())
            .await
            .unwrap();

        assert_eq!(resource.fragment_count(), 2);
        assert_eq!(fragments.len(), 2);
        assert!(backend.get(&resource.backend_key).await.is_ok());
        assert!(catalog.get_fragment(&h1).await.unwrap().is_some());
        assert!(catalog.get_resource(&resource.id).await.unwrap().is_some());
    }
}
