use std::sync::Arc;

use anyhow::Result;

use ekphrasis::config::EkphrasisConfig;
use ekphrasis::pipeline::PipelineOrchestrator;
use ekphrasis::projection::PointCategory;
use ekphrasis::retrieval::background::BackgroundSampleCache;

/// Print the 3-D projection of a narrative, or its JSON with `--json`.
pub async fn visualize(config: &EkphrasisConfig, narrative: &str, as_json: bool) -> Result<()> {
    let retrieval = crate::server::build_retrieval(config)?;
    let background = Arc::new(BackgroundSampleCache::new(
        retrieval.clone(),
        config.retrieval.background_query.clone(),
        config.retrieval.background_top_k,
    ));
    let pipeline = PipelineOrchestrator::new(retrieval, background, config.retrieval.top_k);

    let result = pipeline.run(narrative).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(result.as_ref())?);
        return Ok(());
    }

    let Some(points) = result.points.as_ref() else {
        println!("Nothing to draw (retrieval degraded or too few points).");
        return Ok(());
    };

    println!("{} point(s)\n", points.len());
    // background points are only counted
    let background = points
        .iter()
        .filter(|p| p.category == PointCategory::Background)
        .count();
    println!("  {background} background point(s) omitted");
    println!("  {:<10} {:>9} {:>9} {:>9}  label", "group", "x", "y", "z");
    for p in points
        .iter()
        .filter(|p| p.category != PointCategory::Background)
    {
        let (x, y, z) = p.coordinates;
        println!(
            "  {:<10} {:>9.3} {:>9.3} {:>9.3}  {}",
            p.category.group(),
            x,
            y,
            z,
            p.label
        );
    }

    Ok(())
}
