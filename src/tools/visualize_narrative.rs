//! MCP `visualize_narrative` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `visualize_narrative` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VisualizeNarrativeParams {
    #[schemars(description = "Scene narrative to place in the 3-D latent map")]
    pub narrative: String,
}
