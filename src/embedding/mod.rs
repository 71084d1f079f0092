//! Text-to-vector embedding.
//!
//! Provides the [`EmbeddingClient`] trait and a hosted implementation backed
//! by the Gemini `embedContent` API. The client is created once via
//! [`create_client`] and shared as `Arc<dyn EmbeddingClient>`.

pub mod gemini;

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// What the embedded text will be used for. Hosted models embed queries and
/// stored documents slightly differently, so both sides must say which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingIntent {
    Query,
    Document,
}

impl EmbeddingIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Document => "document",
        }
    }
}

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`dimensions`](Self::dimensions)
/// entries for the lifetime of the client. Blank input is rejected with
/// [`EmbeddingError::EmptyInput`] before any request is made.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, EmbeddingError>;

    /// Return the number of dimensions this client produces.
    fn dimensions(&self) -> usize;
}

/// Create an embedding client from config.
///
/// Currently only `"gemini"` is supported.
pub fn create_client(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingClient>> {
    match config.provider.as_str() {
        "gemini" => {
            let client = gemini::GeminiEmbeddingClient::new(config)?;
            Ok(Box::new(client))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: gemini"),
    }
}
