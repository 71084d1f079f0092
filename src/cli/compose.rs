use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use ekphrasis::collaborators::groq::GroqClient;
use ekphrasis::collaborators::{clamp_temperature, AudioClip, Captioner, PoemGenerator, SpeechSynthesizer};
use ekphrasis::config::EkphrasisConfig;
use ekphrasis::pipeline::PipelineOrchestrator;
use ekphrasis::retrieval::background::BackgroundSampleCache;

async fn read_image(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image: {}", path.display()))
}

/// Print the scene narrative for an image.
pub async fn caption(config: &EkphrasisConfig, image: &Path) -> Result<()> {
    let groq = GroqClient::new(&config.generation)?;
    let bytes = read_image(image).await?;

    let narrative = groq.caption(&bytes).await?;
    println!("{narrative}");
    Ok(())
}

/// Image to poem: caption, retrieve references, generate, and optionally
/// read the poem aloud into `audio`.
pub async fn compose(
    config: &EkphrasisConfig,
    image: &Path,
    temperature: Option<f32>,
    audio: Option<&Path>,
) -> Result<()> {
    let groq = GroqClient::new(&config.generation)?;
    let bytes = read_image(image).await?;

    let narrative = groq.caption(&bytes).await?;
    println!("Scene: {narrative}\n");

    let retrieval = crate::server::build_retrieval(config)?;
    let background = Arc::new(BackgroundSampleCache::new(
        retrieval.clone(),
        config.retrieval.background_query.clone(),
        config.retrieval.background_top_k,
    ));
    let pipeline = PipelineOrchestrator::new(retrieval, background, config.retrieval.top_k);
    let result = pipeline.run(&narrative).await?;

    let references = &result.query_context.references;
    if references.is_empty() {
        println!("(no reference poems found, writing without style references)\n");
    } else {
        let titles: Vec<&str> = references.iter().map(|r| r.title.as_str()).collect();
        println!("Inspired by: {}\n", titles.join(", "));
    }

    let temperature = clamp_temperature(temperature.unwrap_or(config.generation.temperature));
    let poem = groq.generate(&narrative, references, temperature).await;
    println!("{poem}");

    let Some(audio) = audio else {
        return Ok(());
    };

    match AudioClip::validate(groq.synthesize(&poem).await) {
        AudioClip::Playable(clip) => {
            tokio::fs::write(audio, &clip)
                .await
                .with_context(|| format!("failed to write audio: {}", audio.display()))?;
            println!("\nAudio saved to {} ({} bytes)", audio.display(), clip.len());
        }
        AudioClip::Rejected { size } => {
            eprintln!("Warning: speech service returned {size} bytes, too small to be audio");
        }
        AudioClip::Missing => {
            eprintln!("Warning: speech synthesis failed, no audio written");
        }
    }

    Ok(())
}
