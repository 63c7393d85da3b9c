//! `fragstore delete`: removes a compound and decrements its fragments'
//! refcounts. Strict: an unknown name is a usage error.

use anyhow::{Context, Result};
use fragstore::Session;

pub async fn delete(session: &Session, name: String) -> Result<()> {
    session
        .manager
        .delete(&name, true)
        .await
        .with_context(|| format!("deleting {:?}", name))?;
    println!("Deleted {:?}", name);
    Ok(())
}
