//! `fragstore clean`: garbage-collects resources whose fragments are all
//! dead; `-df` additionally defragments sprawling compounds first.

use anyhow::{Context, Result};
use fragstore::Session;

const DEFAULT_MAX_RESOURCES_PER_COMPOUND: usize = 8;

pub async fn clean(session: &Session, defragment: bool) -> Result<()> {
    let collected = session
        .manager
        .clean(defragment, DEFAULT_MAX_RESOURCES_PER_COMPOUND)
        .await
        .context("running clean")?;
    println!("Collected {} resource(s)", collected);
    Ok(())
}
