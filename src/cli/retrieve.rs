use anyhow::Result;

use ekphrasis::config::EkphrasisConfig;
use ekphrasis::retrieval::{top_k_in_range, MAX_TOP_K};

/// Run a one-off retrieval from the terminal.
pub async fn retrieve(config: &EkphrasisConfig, narrative: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    anyhow::ensure!(
        top_k_in_range(top_k),
        "--top-k must be between 1 and {MAX_TOP_K}, got {top_k}"
    );
    let retrieval = crate::server::build_retrieval(config)?;

    let context = retrieval.retrieve(narrative, top_k).await?;

    if context.is_degraded() {
        println!("Retrieval unavailable (embedding or index service failed). See logs.");
        return Ok(());
    }
    if context.references.is_empty() {
        println!("No references found.");
        return Ok(());
    }

    println!("Found {} reference(s)\n", context.references.len());
    for (i, doc) in context.references.iter().enumerate() {
        println!("  {}. {} (score: {:.4})", i + 1, doc.title, doc.score);
        for line in doc.text.lines().take(4) {
            println!("     {line}");
        }
        println!();
    }

    Ok(())
}
