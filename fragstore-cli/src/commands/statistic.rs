//! `fragstore statistic`: prints counts, sizes, the dedup ratio, and
//! per-resource fill efficiency.

use anyhow::{Context, Result};
use fragstore::Session;
use prettytable::{cell, row, Table};

pub async fn statistic(session: &Session) -> Result<()> {
    let stats = session
        .manager
        .statistic()
        .await
        .context("computing statistics")?;

    let mut table = Table::new();
    table.add_row(row!["Compounds", stats.compound_count]);
    table.add_row(row!["Fragments", stats.fragment_count]);
    table.add_row(row!["Resources", stats.resource_count]);
    table.add_row(row!["Logical bytes", stats.total_logical_bytes]);
    table.add_row(row!["Stored bytes", stats.total_stored_bytes]);
    table.add_row(row!["Dedup ratio", format!("{:.2}", stats.dedup_ratio)]);
    table.add_row(row![
        "Fill efficiency",
        format!("{:.2}%", stats.average_fill_efficiency * 100.0)
    ]);
    table.printstd();
    Ok(())
}
