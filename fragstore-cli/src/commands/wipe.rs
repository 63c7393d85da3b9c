//! `fragstore wipe`: drops the catalog; `-c` also deletes every resource
//! from the backend.

use anyhow::{Context, Result};
use fragstore::Session;

pub async fn wipe(session: &Session, clear_backend: bool) -> Result<()> {
    session
        .manager
        .wipe(clear_backend)
        .await
        .context("wiping catalog")?;
    if clear_backend {
        println!("Wiped catalog and backend resources");
    } else {
        println!("Wiped catalog");
    }
    Ok(())
}
