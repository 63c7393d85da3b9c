//! The compound manager (C8): the named-stream layer. Creates, updates,
//! lists, and deletes compounds; drives the fragment pipeline on upload and
//! reassembles streams on download.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use fragstore_core::codec::{EncapsulationError, EncapsulationSpec};
use fragstore_core::format::FormatError;
use fragstore_core::{Compound, FragmentHash, StreamHash, StreamHasher};

use crate::assembler::AssemblerError;
use crate::backend::{Backend, BackendError};
use crate::cache::ResourceCache;
use crate::catalog::{Catalog, CatalogError, CatalogStore};
use crate::pipeline::{Pipeline, PipelineError};

use fragstore_chunker::{Chunker, FixedSize};

#[derive(Error, Debug)]
pub enum CompoundManagerError {
    #[error("usage error: {0}")]
    Usage(String),
    #[error("a compound named {0:?} already exists")]
    CompoundExists(String),
    #[error("compound {name:?} failed its integrity check on download: {reason}")]
    CompoundCorrupt { name: String, reason: String },
    #[error("resource {resource_id} is corrupt: {reason}")]
    ResourceCorrupt {
        resource_id: String,
        reason: String,
    },
    #[error("catalog error")]
    Catalog(#[from] CatalogError),
    #[error("backend error")]
    Backend(#[from] BackendError),
    #[error("pipeline error")]
    Pipeline(#[from] PipelineError),
    #[error("assembler error")]
    Assembler(#[from] AssemblerError),
    #[error("encapsulation error")]
    Encapsulation(#[from] EncapsulationError),
    #[error("resource format error")]
    Format(#[from] FormatError),
    #[error("local I/O error")]
    Io(#[from] std::io::Error),
    #[error("upload join error")]
    Join(#[from] tokio::task::JoinError),
}

type Result<T> = std::result::Result<T, CompoundManagerError>;

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub overwrite: bool,
    /// Compare the source against the previously stored `total_hash`
    /// before reading/chunking it at all; matching files are skipped.
    pub update: bool,
    pub fragment_size: u64,
    pub target_resource_size: u64,
    pub max_fragments_per_resource: usize,
    pub first_layer_spec: EncapsulationSpec,
    pub second_layer_spec: EncapsulationSpec,
}

impl Default for UploadOptions {
    fn default() -> UploadOptions {
        UploadOptions {
            overwrite: false,
            update: false,
            fragment_size: 64 * 1024,
            target_resource_size: 4 * 1024 * 1024,
            max_fragments_per_resource: 256,
            first_layer_spec: vec![],
            second_layer_spec: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistic {
    pub compound_count: usize,
    pub fragment_count: usize,
    pub resource_count: usize,
    pub total_logical_bytes: u64,
    pub total_stored_bytes: u64,
    pub dedup_ratio: f64,
    /// Mean, across every resource, of fragment bytes versus the framed
    /// inner payload's total size — how much of a resource is actual
    /// fragment data versus framing overhead. `1.0` when there are no
    /// resources.
    pub average_fill_efficiency: f64,
}

pub struct CompoundManager<B, C> {
    backend: Arc<B>,
    catalog: CatalogStore<C>,
    resource_cache: ResourceCache,
}

impl<B: Backend, C: Catalog> CompoundManager<B, C> {
    pub fn new(backend: B, catalog: C, resource_cache_capacity_bytes: u64) -> CompoundManager<B, C> {
        CompoundManager {
            backend: Arc::new(backend),
            catalog: CatalogStore::new(catalog),
            resource_cache: ResourceCache::new(resource_cache_capacity_bytes),
        }
    }

    #[instrument(skip(self, reader, options))]
    pub async fn upload<R: Read + Send + 'static>(
        &self,
        name: &str,
        reader: R,
        options: &UploadOptions,
    ) -> Result<Compound> {
        let existing = self.catalog.get_compound(name).await?;
        if !options.overwrite && existing.is_some() {
            return Err(CompoundManagerError::CompoundExists(name.to_string()));
        }

        let (hash_tx, hash_rx) = std::sync::mpsc::channel::<Vec<u8>>();
        let hash_handle = tokio::task::spawn_blocking(move || {
            let mut hasher = StreamHasher::new();
            while let Ok(chunk) = hash_rx.recv() {
                hasher.update(&chunk);
            }
            hasher.finish()
        });

        let chunker = FixedSize {
            len: options.fragment_size as usize,
        };
        let mut pipeline = Pipeline::new(options.target_resource_size, options.max_fragments_per_resource);
        let mut fragment_sequence = Vec::new();
        let mut total_size = 0u64;

        for chunk in chunker.chunk(reader) {
            let chunk = chunk.map_err(|e| CompoundManagerError::Usage(e.to_string()))?;
            total_size += chunk.len() as u64;
            let _ = hash_tx.send(chunk.clone());
            let hash = pipeline
                .ingest_chunk(&self.catalog, chunk, &options.first_layer_spec)
                .await?;
            fragment_sequence.push(hash);

            if pipeline.should_flush() {
                pipeline
                    .flush(&*self.backend, &self.catalog, options.second_layer_spec.clone())
                    .await?;
            }
        }
        pipeline
            .flush(&*self.backend, &self.catalog, options.second_layer_spec.clone())
            .await?;

        drop(hash_tx);
        let total_hash = hash_handle.await?;

        let compound = Compound::new(
            name.to_string(),
            total_size,
            total_hash,
            options.first_layer_spec.clone(),
            options.fragment_size,
            fragment_sequence,
        );

        // An overwrite's new fragment sequence may have already bumped
        // some of the old sequence's refcounts back up via dedup (each
        // `ingest_chunk` hit commits its own retain as it streams); this
        // releases the replaced compound's positions so the net refcount
        // reflects only the sequence being committed now, not both.
        let released = match &existing {
            Some(old) => self.decrement_references(old).await?,
            None => Vec::new(),
        };
        self.catalog.commit_compound(compound.clone(), released).await?;
        info!("uploaded compound {:?} ({} bytes)", name, total_size);
        Ok(compound)
    }

    /// Walks `dir` and uploads each file as its own compound named
    /// `name_prefix/relative_path`, skipping unchanged files the same way
    /// `-u` does for a single file.
    #[instrument(skip(self, options))]
    pub async fn upload_tree(
        &self,
        name_prefix: &str,
        dir: &std::path::Path,
        options: &UploadOptions,
    ) -> Result<Vec<Compound>> {
        let mut uploaded = Vec::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let name = format!("{}/{}", name_prefix, relative);

            if options.update {
                if let Some(existing) = self.catalog.get_compound(&name).await? {
                    if self.file_hash_matches(entry.path(), &existing.total_hash)? {
                        continue;
                    }
                }
            }

            let file = std::fs::File::open(entry.path())?;
            let mut opts = options.clone();
            opts.overwrite = true;
            let compound = self.upload(&name, file, &opts).await?;
            uploaded.push(compound);
        }
        Ok(uploaded)
    }

    fn file_hash_matches(&self, path: &std::path::Path, expected: &StreamHash) -> Result<bool> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = StreamHasher::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish().as_bytes() == expected.as_bytes())
    }

    #[instrument(skip(self))]
    pub async fn download(&self, name: &str) -> Result<Vec<u8>> {
        let compound = self
            .catalog
            .get_compound(name)
            .await?
            .ok_or_else(|| CompoundManagerError::Usage(format!("no such compound {:?}", name)))?;

        let mut out = Vec::with_capacity(compound.total_size as usize);
        let mut hasher = StreamHasher::new();

        for hash in &compound.fragment_sequence {
            let chunk = self.fetch_fragment_chunk(hash, &compound.encapsulation_spec).await?;
            hasher.update(&chunk);
            out.extend_from_slice(&chunk);
        }

        let total_hash = hasher.finish();
        if total_hash.as_bytes() != compound.total_hash.as_bytes() {
            warn!("compound {:?} failed total_hash verification on download", name);
            return Err(CompoundManagerError::CompoundCorrupt {
                name: name.to_string(),
                reason: "total_hash mismatch".to_string(),
            });
        }
        Ok(out)
    }

    async fn fetch_fragment_chunk(
        &self,
        hash: &FragmentHash,
        first_layer_spec: &EncapsulationSpec,
    ) -> Result<Vec<u8>> {
        let fragment = self.catalog.get_fragment(hash).await?.ok_or_else(|| {
            CompoundManagerError::CompoundCorrupt {
                name: String::new(),
                reason: format!("fragment {:?} missing from catalog", hash),
            }
        })?;
        let resource = self
            .catalog
            .get_resource(&fragment.resource_ref.resource_id)
            .await?
            .ok_or_else(|| CompoundManagerError::ResourceCorrupt {
                resource_id: format!("{:?}", fragment.resource_ref.resource_id),
                reason: "resource missing from catalog".to_string(),
            })?;

        let inner_payload = self.fetch_resource_payload(&resource).await?;
        let start = fragment.resource_ref.offset as usize;
        let end = start + fragment.resource_ref.length as usize;
        if end > inner_payload.len() {
            return Err(CompoundManagerError::ResourceCorrupt {
                resource_id: format!("{:?}", resource.id),
                reason: "fragment offset/length out of bounds".to_string(),
            });
        }
        let body = inner_payload[start..end].to_vec();
        if FragmentHash::of(&body) != *hash {
            return Err(CompoundManagerError::ResourceCorrupt {
                resource_id: format!("{:?}", resource.id),
                reason: format!("fragment {:?} failed hash verification on download", hash),
            });
        }
        let chunk = fragstore_core::codec::reverse(first_layer_spec, body)?;
        Ok(chunk)
    }

    /// Fetches and fully decodes a resource's framed inner payload,
    /// serving it from the resource cache when present (the concurrency
    /// model's prefetch point — §5(c) — lives at the call site in
    /// `download`, which can kick off the next resource's fetch before
    /// finishing with the current one).
    async fn fetch_resource_payload(&self, resource: &fragstore_core::Resource) -> Result<Arc<Vec<u8>>> {
        if let Some(cached) = self.resource_cache.get(&resource.id).await {
            return Ok(cached);
        }
        let raw = self.backend.get(&resource.backend_key).await.map_err(|e| {
            CompoundManagerError::ResourceCorrupt {
                resource_id: format!("{:?}", resource.id),
                reason: e.to_string(),
            }
        })?;
        let inner_payload = fragstore_core::codec::reverse(&resource.wrapper_spec, raw).map_err(|e| {
            CompoundManagerError::ResourceCorrupt {
                resource_id: format!("{:?}", resource.id),
                reason: e.to_string(),
            }
        })?;
        let inner_payload = Arc::new(inner_payload);
        self.resource_cache.insert(resource.id, inner_payload.clone()).await;
        Ok(inner_payload)
    }

    pub async fn list(&self) -> Result<Vec<Compound>> {
        Ok(self.catalog.list_compounds().await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str, strict: bool) -> Result<()> {
        let compound = self.catalog.get_compound(name).await?;
        let compound = match compound {
            Some(c) => c,
            None if strict => {
                return Err(CompoundManagerError::Usage(format!(
                    "no such compound {:?}",
                    name
                )))
            }
            None => return Ok(()),
        };

        let decremented = self.decrement_references(&compound).await?;
        self.catalog.delete_compound(name, decremented).await?;
        Ok(())
    }

    /// Computes each referenced fragment with its refcount decremented by
    /// however many positions this compound held, without writing anything
    /// back — callers decide whether that goes through `delete_compound`
    /// (delete) or a defragmenting rewrite.
    async fn decrement_references(&self, compound: &Compound) -> Result<Vec<fragstore_core::Fragment>> {
        let mut counts: HashMap<FragmentHash, u64> = HashMap::new();
        for hash in &compound.fragment_sequence {
            *counts.entry(*hash).or_insert(0) += 1;
        }
        let mut decremented = Vec::with_capacity(counts.len());
        for (hash, count) in counts {
            if let Some(mut fragment) = self.catalog.get_fragment(&hash).await? {
                for _ in 0..count {
                    fragment.release();
                }
                decremented.push(fragment);
            }
        }
        Ok(decremented)
    }

    #[instrument(skip(self))]
    pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mut compound = self
            .catalog
            .get_compound(old)
            .await?
            .ok_or_else(|| CompoundManagerError::Usage(format!("no such compound {:?}", old)))?;
        if self.catalog.get_compound(new).await?.is_some() {
            return Err(CompoundManagerError::CompoundExists(new.to_string()));
        }
        compound.name = new.to_string();
        self.catalog.commit_compound(compound, Vec::new()).await?;
        self.catalog.delete_compound(old, Vec::new()).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn statistic(&self) -> Result<Statistic> {
        let compounds = self.catalog.list_compounds().await?;
        let fragments = self.catalog.all_fragments().await?;
        let resources = self.catalog.all_resources().await?;

        let total_logical_bytes: u64 = compounds.iter().map(|c| c.total_size).sum();
        let total_stored_bytes: u64 = resources.iter().map(|r| r.total_size).sum();
        let positions: u64 = compounds
            .iter()
            .map(|c| c.fragment_sequence.len() as u64)
            .sum();
        let dedup_ratio = if fragments.is_empty() {
            1.0
        } else {
            positions as f64 / fragments.len() as f64
        };

        let average_fill_efficiency = if resources.is_empty() {
            1.0
        } else {
            let sum: f64 = resources
                .iter()
                .map(|r| r.fill_efficiency(r.framed_inner_size()))
                .sum();
            sum / resources.len() as f64
        };

        Ok(Statistic {
            compound_count: compounds.len(),
            fragment_count: fragments.len(),
            resource_count: resources.len(),
            total_logical_bytes,
            total_stored_bytes,
            dedup_ratio,
            average_fill_efficiency,
        })
    }

    /// Garbage-collects resources whose fragments are all dead. With
    /// `defragment`, additionally rewrites compounds whose fragments span
    /// more than `max_resources_per_compound` resources into fresh,
    /// well-packed resources, releasing the stale references afterward.
    ///
    /// Never deletes a resource that still carries a live fragment, even
    /// partially — that would orphan the other fragments it carries.
    #[instrument(skip(self))]
    pub async fn clean(&self, defragment: bool, max_resources_per_compound: usize) -> Result<usize> {
        if defragment {
            // Rewriting sprawling compounds first releases their stale
            // fragment references, so the dead resources they leave behind
            // are collected by the same `clean` pass instead of needing a
            // second run.
            self.defragment_sprawling_compounds(max_resources_per_compound).await?;
        }

        let resources = self.catalog.all_resources().await?;
        let mut collected = 0;
        for resource in &resources {
            let hashes = self.catalog.resource_fragment_hashes(&resource.id).await?;
            let mut all_dead = true;
            for hash in &hashes {
                match self.catalog.get_fragment(hash).await? {
                    Some(fragment) if !fragment.is_dead() => {
                        all_dead = false;
                        break;
                    }
                    _ => {}
                }
            }
            if all_dead {
                self.backend.delete(&resource.backend_key).await.ok();
                self.catalog.delete_resource(&resource.id).await?;
                collected += 1;
            }
        }

        Ok(collected)
    }

    /// Drops the entire catalog; with `clear_backend`, also deletes every
    /// resource blob the catalog knew about first (best-effort — a backend
    /// delete failure does not stop the catalog from being wiped).
    #[instrument(skip(self))]
    pub async fn wipe(&self, clear_backend: bool) -> Result<()> {
        if clear_backend {
            for resource in self.catalog.all_resources().await? {
                if let Err(e) = self.backend.delete(&resource.backend_key).await {
                    warn!(
                        "failed to delete backend blob {:?} during wipe: {}",
                        resource.backend_key, e
                    );
                }
            }
        }
        self.catalog.wipe().await?;
        Ok(())
    }

    async fn defragment_sprawling_compounds(&self, max_resources_per_compound: usize) -> Result<()> {
        let compounds = self.catalog.list_compounds().await?;
        for compound in compounds {
            let mut resource_ids = std::collections::HashSet::new();
            for hash in &compound.fragment_sequence {
                if let Some(fragment) = self.catalog.get_fragment(hash).await? {
                    resource_ids.insert(fragment.resource_ref.resource_id);
                }
            }
            if resource_ids.len() <= max_resources_per_compound {
                continue;
            }
            info!(
                "defragmenting compound {:?}: fragments span {} resources",
                compound.name,
                resource_ids.len()
            );

            // Carry forward whatever second-layer wrapping the existing
            // resources used, so repacking doesn't silently strip it.
            let mut wrapper_spec = Vec::new();
            for id in &resource_ids {
                if let Some(resource) = self.catalog.get_resource(id).await? {
                    wrapper_spec = resource.wrapper_spec;
                    break;
                }
            }

            let bytes = self.download(&compound.name).await?;

            // Release this compound's references before rewriting it, so
            // the fresh upload below creates brand-new, well-packed
            // resources rather than re-deduping against (and re-retaining)
            // the very fragments being replaced.
            let decremented = self.decrement_references(&compound).await?;
            self.catalog
                .delete_compound(&compound.name, decremented)
                .await?;

            let options = UploadOptions {
                overwrite: true,
                update: false,
                fragment_size: compound.fragment_size,
                target_resource_size: u64::MAX,
                max_fragments_per_resource: compound.fragment_sequence.len().max(1),
                first_layer_spec: compound.encapsulation_spec.clone(),
                second_layer_spec: wrapper_spec,
            };
            self.upload(&compound.name, std::io::Cursor::new(bytes), &options)
                .await?;
        }
        Ok(())
    }
}
