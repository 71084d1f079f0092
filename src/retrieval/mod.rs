//! Retrieval: narrative -> query vector -> ranked references.
//!
//! [`RetrievalCoordinator`] is the single entry point. Service failures
//! degrade to an empty [`QueryContext`]; only dimensionality errors escape,
//! as [`PipelineError::DimensionMismatch`].

pub mod background;
pub mod types;

use std::sync::Arc;

use crate::embedding::{EmbeddingClient, EmbeddingIntent};
use crate::error::PipelineError;
use crate::index::VectorIndexClient;

pub use types::{EmbeddingVector, QueryContext, ReferenceDocument};

/// Largest `top_k` a caller may ask for.
pub const MAX_TOP_K: usize = 20;

/// `true` when `top_k` is a reference count callers may request.
pub fn top_k_in_range(top_k: usize) -> bool {
    (1..=MAX_TOP_K).contains(&top_k)
}

/// Embeds a narrative and searches the index with it.
#[derive(Clone)]
pub struct RetrievalCoordinator {
    embedding: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndexClient>,
}

impl RetrievalCoordinator {
    pub fn new(embedding: Arc<dyn EmbeddingClient>, index: Arc<dyn VectorIndexClient>) -> Self {
        Self { embedding, index }
    }

    /// Dimensionality every vector in this pipeline must have.
    pub fn dimensions(&self) -> usize {
        self.embedding.dimensions()
    }

    /// Embed `narrative`, then fetch its `top_k` nearest references.
    ///
    /// The search depends on the embedding, so the two calls run in order.
    /// Embedding or search failures return a degraded context; a vector of
    /// the wrong width from either service is fatal.
    pub async fn retrieve(
        &self,
        narrative: &str,
        top_k: usize,
    ) -> Result<QueryContext, PipelineError> {
        if narrative.trim().is_empty() {
            tracing::warn!("retrieve called with blank narrative");
            return Ok(QueryContext::degraded(narrative));
        }

        tracing::info!(narrative = %narrative, top_k, "retrieving references");

        let query_vector = match self.embedding.embed(narrative, EmbeddingIntent::Query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "embedding failed, returning empty context");
                return Ok(QueryContext::degraded(narrative));
            }
        };

        let expected = self.dimensions();
        if query_vector.len() != expected {
            return Err(PipelineError::DimensionMismatch {
                context: "query embedding",
                expected,
                actual: query_vector.len(),
            });
        }

        let references = match self.index.search(&query_vector, top_k).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::error!(error = %e, "index search failed");
                return match e.into_fatal() {
                    Some(fatal) => Err(fatal),
                    None => Ok(QueryContext::degraded(narrative)),
                };
            }
        };

        if let Some(bad) = references.iter().find(|d| d.vector.len() != expected) {
            return Err(PipelineError::DimensionMismatch {
                context: "stored document",
                expected,
                actual: bad.vector.len(),
            });
        }

        if references.is_empty() {
            tracing::info!("no matches found");
        }
        for doc in &references {
            tracing::debug!(title = %doc.title, score = doc.score, "match");
        }
        tracing::info!(matches = references.len(), "retrieval complete");

        Ok(QueryContext {
            narrative: narrative.to_string(),
            query_vector,
            references,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_bounds() {
        assert!(!top_k_in_range(0));
        assert!(top_k_in_range(1));
        assert!(top_k_in_range(MAX_TOP_K));
        assert!(!top_k_in_range(MAX_TOP_K + 1));
        assert!(!top_k_in_range(10_000));
    }
}
