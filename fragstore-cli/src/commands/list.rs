//! `fragstore list`: enumerates compounds in the catalog.

use anyhow::{Context, Result};
use fragstore::Session;
use prettytable::{cell, row, Table};

pub async fn list(session: &Session, details: bool) -> Result<()> {
    let mut compounds = session.manager.list().await.context("listing compounds")?;
    compounds.sort_by(|a, b| a.name.cmp(&b.name));

    println!("{} compound(s)", compounds.len());

    let mut table = Table::new();
    if details {
        table.add_row(row!["Name", "Size (bytes)", "Fragments", "Fragment Size"]);
        for compound in &compounds {
            table.add_row(row![
                compound.name,
                compound.total_size,
                compound.fragment_sequence.len(),
                compound.fragment_size
            ]);
        }
    } else {
        table.add_row(row!["Name"]);
        for compound in &compounds {
            table.add_row(row![compound.name]);
        }
    }
    table.printstd();
    Ok(())
}
