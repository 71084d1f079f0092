//! Nearest-neighbor search over the reference corpus.
//!
//! [`VectorIndexClient`] is the seam the retrieval coordinator searches
//! through. Two backends exist: [`pinecone::PineconeIndex`] for the hosted
//! corpus and [`local::LocalIndex`], a SQLite + sqlite-vec store for offline
//! use.

pub mod local;
pub mod pinecone;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::EkphrasisConfig;
use crate::error::IndexError;
use crate::retrieval::types::ReferenceDocument;

/// Fallback title for matches stored without one.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Search interface over a vector index.
///
/// Results come back in the index's own order (descending similarity) and
/// must not be re-sorted. Zero matches is `Ok(vec![])`.
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ReferenceDocument>, IndexError>;
}

/// A pre-embedded corpus record, in the same shape the hosted index upserts.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Create the configured index backend.
pub fn create_index(config: &EkphrasisConfig) -> anyhow::Result<Arc<dyn VectorIndexClient>> {
    match config.index.provider.as_str() {
        "pinecone" => Ok(Arc::new(pinecone::PineconeIndex::new(&config.index)?)),
        "local" => {
            let path = config.resolved_index_path();
            let index = local::LocalIndex::open(&path, config.embedding.dimensions)?;
            Ok(Arc::new(index))
        }
        other => anyhow::bail!("unknown index provider: {other}. Supported: pinecone, local"),
    }
}
