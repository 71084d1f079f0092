//! Error taxonomy for the retrieval core.
//!
//! [`EmbeddingError`] and [`IndexError`] are transient service failures. The
//! retrieval coordinator absorbs them into a degraded [`QueryContext`]
//! instead of raising. [`PipelineError`] only carries fatal kinds that a retry
//! cannot fix, so anything that reaches a caller through it should stop the
//! pipeline.
//!
//! [`CaptionError`] and [`CompletionError`] belong to the hosted model steps
//! outside the core.
//!
//! [`QueryContext`]: crate::retrieval::QueryContext

use thiserror::Error;

/// Failure of the external embedding service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding input is empty")]
    EmptyInput,

    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Failure of the nearest-neighbor search service.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("index returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid index response: {0}")]
    InvalidResponse(String),

    #[error("index storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("index task failed: {0}")]
    Task(String),

    #[error("index expects {expected}-dimensional vectors, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Failure of the vision captioning step.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("image is empty")]
    EmptyImage,

    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedImage,

    #[error("caption request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vision service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid caption response: {0}")]
    InvalidResponse(String),

    #[error("image unavailable: {0}")]
    Unavailable(String),

    /// A failure reported across a string boundary with the `ERROR:` prefix.
    #[error("{0}")]
    Remote(String),
}

/// Failure of a chat-completion or speech request.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

/// Fatal, configuration-level failures of the retrieval pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Vectors of different lengths met in one operation. Stored documents
    /// and live queries must come from the same embedding model.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A cache lock was poisoned by a panicking holder; its contents can no
    /// longer be trusted.
    #[error("cache corrupted: {0}")]
    CacheCorrupted(String),
}

impl PipelineError {
    /// Every pipeline error is unrecoverable for the process; transient
    /// service errors never surface through this type.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::DimensionMismatch { .. } | Self::CacheCorrupted(_) => true,
        }
    }
}

impl IndexError {
    /// Promote the one index failure that is really a configuration error.
    pub fn into_fatal(self) -> Option<PipelineError> {
        match self {
            Self::Dimension { expected, actual } => Some(PipelineError::DimensionMismatch {
                context: "index search",
                expected,
                actual,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_dimension_error_promotes_to_fatal() {
        let err = IndexError::Dimension {
            expected: 768,
            actual: 384,
        }
        .into_fatal()
        .expect("dimension error should promote");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("expected 768, got 384"));
    }

    #[test]
    fn transient_index_errors_do_not_promote() {
        assert!(IndexError::InvalidResponse("missing matches".into())
            .into_fatal()
            .is_none());
    }
}
