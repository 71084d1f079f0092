//! MCP `retrieve_references` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `retrieve_references` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RetrieveReferencesParams {
    /// Scene narrative to search with.
    #[schemars(
        description = "Scene narrative, e.g. 'A Melancholic poem about Solitude, featuring imagery of a window, rain.'"
    )]
    pub narrative: String,

    /// Number of references to return. Defaults to the configured `top_k`.
    #[schemars(description = "Number of reference poems to return (1-20). Defaults to 3.")]
    pub top_k: Option<usize>,
}
