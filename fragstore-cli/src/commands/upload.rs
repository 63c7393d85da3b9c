//! `fragstore upload`: ingests a file, a directory, or stdin as one or
//! more compounds.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use fragstore::{Session, UploadOptions};
use tracing::info;

use crate::cli::ByteSize;

#[allow(clippy::too_many_arguments)]
pub async fn upload(
    session: &Session,
    input: Option<PathBuf>,
    name: Option<String>,
    overwrite: bool,
    update: bool,
    fragment_size: Option<ByteSize>,
    resource_size: Option<ByteSize>,
) -> Result<()> {
    let config = &session.config;
    let options = UploadOptions {
        overwrite,
        update,
        fragment_size: fragment_size.map(|s| s.0).unwrap_or(config.fragment_size),
        target_resource_size: resource_size.map(|s| s.0).unwrap_or(config.target_resource_size),
        max_fragments_per_resource: config.max_fragments_per_resource,
        first_layer_spec: config.first_layer_spec.clone(),
        second_layer_spec: config.second_layer_spec.clone(),
    };

    match input {
        Some(path) if path.is_dir() => {
            let prefix = name.unwrap_or_else(|| default_name(&path));
            let compounds = session
                .manager
                .upload_tree(&prefix, &path, &options)
                .await
                .with_context(|| format!("uploading directory {:?}", path))?;
            println!("Uploaded {} file(s) under {:?}", compounds.len(), prefix);
        }
        Some(path) => {
            let name = name.unwrap_or_else(|| default_name(&path));
            let file = std::fs::File::open(&path)
                .with_context(|| format!("opening {:?} for upload", path))?;
            let compound = session
                .manager
                .upload(&name, file, &options)
                .await
                .with_context(|| format!("uploading {:?}", path))?;
            info!("uploaded compound {:?}", compound.name);
            println!(
                "Uploaded {:?} ({} bytes, {} fragments)",
                compound.name,
                compound.total_size,
                compound.fragment_sequence.len()
            );
        }
        None => {
            let name = name.ok_or_else(|| {
                anyhow!("a --name is required when uploading from stdin")
            })?;
            // `Stdin` itself (unlike its `lock()` guard) is `'static`, so
            // it can be handed straight to the chunker without buffering
            // the whole stream in memory first.
            let compound = session
                .manager
                .upload(&name, io::stdin(), &options)
                .await
                .context("uploading from stdin")?;
            println!(
                "Uploaded {:?} ({} bytes, {} fragments)",
                compound.name,
                compound.total_size,
                compound.fragment_sequence.len()
            );
        }
    }
    Ok(())
}

fn default_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
