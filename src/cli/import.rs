use std::path::Path;

use anyhow::{Context, Result};

use ekphrasis::config::EkphrasisConfig;
use ekphrasis::index::local::LocalIndex;
use ekphrasis::index::IndexRecord;

/// Load pre-embedded records into the local index.
///
/// The file is a JSON array in the hosted index's upsert shape:
/// `[{"id": "...", "values": [...], "metadata": {"title": "...", "text": "..."}}]`.
/// Existing ids are overwritten; records without an id get a fresh one.
pub async fn import(config: &EkphrasisConfig, file: &Path) -> Result<()> {
    let json = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let records: Vec<IndexRecord> =
        serde_json::from_str(&json).context("failed to parse import JSON")?;

    let path = config.resolved_index_path();
    let dimensions = config.embedding.dimensions;
    println!(
        "Importing {} record(s) into {}...",
        records.len(),
        path.display()
    );

    let (imported, total) = tokio::task::spawn_blocking(move || -> Result<(usize, usize)> {
        let index = LocalIndex::open(&path, dimensions)?;
        let imported = index.upsert(&records)?;
        Ok((imported, index.count()?))
    })
    .await??;

    println!("Import complete:");
    println!("  Records imported: {imported}");
    println!("  Index size:       {total}");

    Ok(())
}
