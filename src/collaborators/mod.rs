//! Hosted model steps around the retrieval core: captioning, poem
//! generation, and speech.
//!
//! Each step is a trait so front ends and tests can substitute their own.
//! [`groq::GroqClient`] implements all three against an OpenAI-compatible
//! API.

pub mod groq;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CaptionError;
use crate::retrieval::ReferenceDocument;

/// Prefix marking a failed caption when it has to travel as a plain string.
pub const CAPTION_ERROR_PREFIX: &str = "ERROR:";

/// Audio shorter than this is a provider's error page, not speech.
pub const MIN_AUDIO_BYTES: usize = 1000;

pub const MIN_TEMPERATURE: f32 = 0.1;
pub const MAX_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Returned by generators whenever the model call fails.
pub const FALLBACK_POEM: &str = "The camera is blind,\nThe words wont find,\nA path to you.";

/// Image bytes in, narrative out.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &[u8]) -> Result<String, CaptionError>;
}

/// Narrative plus references in, short poem out. Never fails; falls back to
/// [`FALLBACK_POEM`].
#[async_trait]
pub trait PoemGenerator: Send + Sync {
    async fn generate(
        &self,
        narrative: &str,
        references: &[ReferenceDocument],
        temperature: f32,
    ) -> String;
}

/// Text in, audio bytes out, or `None` when synthesis failed.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Option<Vec<u8>>;
}

/// What the vision model reports about a scene.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneAnalysis {
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub concrete_nouns: Vec<String>,
}

impl SceneAnalysis {
    /// The narrative string used as the retrieval query. Stored documents
    /// were embedded from the same template.
    pub fn narrative(&self) -> String {
        let mood = self
            .mood
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Unknown");
        format!(
            "A {mood} poem about {}, featuring imagery of {}.",
            self.themes.join(", "),
            self.concrete_nouns.join(", ")
        )
    }
}

/// Encode a caption result as a single string for boundaries that cannot
/// carry a `Result`.
pub fn encode_caption(result: &Result<String, CaptionError>) -> String {
    match result {
        Ok(narrative) => narrative.clone(),
        Err(e) => format!("{CAPTION_ERROR_PREFIX} {e}"),
    }
}

/// Inverse of [`encode_caption`]. Only the exact prefix marks a failure.
pub fn decode_caption(wire: &str) -> Result<String, CaptionError> {
    match wire.strip_prefix(CAPTION_ERROR_PREFIX) {
        Some(message) => Err(CaptionError::Remote(message.trim().to_string())),
        None => Ok(wire.to_string()),
    }
}

/// Clamp a requested temperature into the range the generator accepts.
pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_finite() {
        temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    } else {
        DEFAULT_TEMPERATURE
    }
}

/// Result of a speech request after the size check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioClip {
    /// Playable audio (MPEG).
    Playable(Vec<u8>),
    /// The provider answered with something too small to be audio.
    Rejected { size: usize },
    /// No audio came back at all.
    Missing,
}

impl AudioClip {
    pub fn validate(bytes: Option<Vec<u8>>) -> Self {
        match bytes {
            None => Self::Missing,
            Some(b) if b.len() < MIN_AUDIO_BYTES => Self::Rejected { size: b.len() },
            Some(b) => Self::Playable(b),
        }
    }
}
