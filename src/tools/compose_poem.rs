//! MCP `compose_poem` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `compose_poem` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ComposePoemParams {
    #[schemars(description = "Scene narrative, usually the output of caption_image")]
    pub narrative: String,

    /// Sampling temperature, clamped to 0.1-1.0.
    #[schemars(description = "Creativity, 0.1-1.0. Defaults to the configured temperature.")]
    pub temperature: Option<f32>,

    /// When set, the poem is also read aloud and the MP3 written here.
    #[schemars(description = "Optional file path to write an MP3 reading of the poem to")]
    pub audio_path: Option<String>,
}
