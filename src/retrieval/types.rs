//! Core retrieval type definitions.
//!
//! Defines [`ReferenceDocument`] (one ranked match from the index) and
//! [`QueryContext`] (a narrative, its query vector, and the ranked matches).

use serde::Serialize;

/// A fixed-length embedding. The length is set by the embedding model for
/// the lifetime of a corpus.
pub type EmbeddingVector = Vec<f32>;

/// A single ranked match from the vector index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceDocument {
    /// Stable, index-assigned identifier.
    pub id: String,
    /// Stored embedding of the document. Not serialized; callers that render
    /// references only need the text.
    #[serde(skip)]
    pub vector: EmbeddingVector,
    /// Full text of the reference poem.
    pub text: String,
    /// Display title, `"Unknown"` when the index has none.
    pub title: String,
    /// Index similarity. Only comparable within one result set.
    pub score: f32,
}

/// The product of one retrieval: what was asked, where it landed, and what
/// came back, in index order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryContext {
    pub narrative: String,
    /// Empty when the retrieval degraded.
    #[serde(skip)]
    pub query_vector: EmbeddingVector,
    pub references: Vec<ReferenceDocument>,
}

impl QueryContext {
    /// A degraded context: no query vector, no references. Produced when the
    /// embedding or search call failed so the caller can still show the
    /// narrative.
    pub fn degraded(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            query_vector: Vec::new(),
            references: Vec::new(),
        }
    }

    /// `true` when the retrieval failed and there is nothing to render.
    pub fn is_degraded(&self) -> bool {
        self.query_vector.is_empty()
    }

    /// Dimensionality of the query vector (0 when degraded).
    pub fn dimensions(&self) -> usize {
        self.query_vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_context_is_empty() {
        let ctx = QueryContext::degraded("A Serene poem about Nature.");
        assert!(ctx.is_degraded());
        assert!(ctx.references.is_empty());
        assert_eq!(ctx.dimensions(), 0);
        assert_eq!(ctx.narrative, "A Serene poem about Nature.");
    }

    #[test]
    fn serialized_context_omits_vectors() {
        let ctx = QueryContext {
            narrative: "rain".into(),
            query_vector: vec![0.5; 4],
            references: vec![ReferenceDocument {
                id: "42".into(),
                vector: vec![0.1; 4],
                text: "Hope is the thing with feathers".into(),
                title: "Poem 42".into(),
                score: 0.91,
            }],
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("query_vector").is_none());
        assert!(json["references"][0].get("vector").is_none());
        assert_eq!(json["references"][0]["title"], "Poem 42");
    }
}
