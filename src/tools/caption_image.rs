//! MCP `caption_image` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `caption_image` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CaptionImageParams {
    /// Image path, read by the server process.
    #[schemars(description = "Path to a JPEG or PNG image on the server's filesystem")]
    pub path: String,
}
