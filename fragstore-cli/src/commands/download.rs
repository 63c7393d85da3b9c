//! `fragstore download`: retrieves a compound and verifies its integrity.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fragstore::Session;

pub async fn download(session: &Session, name: String, output: Option<PathBuf>) -> Result<()> {
    let bytes = session
        .manager
        .download(&name)
        .await
        .with_context(|| format!("downloading {:?}", name))?;

    match output {
        Some(path) => {
            std::fs::write(&path, &bytes).with_context(|| format!("writing {:?}", path))?;
        }
        None => {
            std::io::stdout()
                .write_all(&bytes)
                .context("writing to stdout")?;
        }
    }
    Ok(())
}
