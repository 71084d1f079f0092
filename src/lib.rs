//! Ekphrasis: image-to-poem retrieval and latent-space visualization.
//!
//! A captioned scene becomes a narrative string. The narrative is embedded,
//! matched against a corpus of reference poems, and projected together with
//! a fixed background sample of the corpus into three dimensions so a front
//! end can draw where the scene landed.
//!
//! # Architecture
//!
//! - **Embeddings**: hosted Gemini `embedContent` (768 dimensions)
//! - **Index**: Pinecone over HTTPS, or a local SQLite store with
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec)
//! - **Projection**: per-call standardization and PCA via `ndarray`
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP/SSE
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`embedding`]: the [`embedding::EmbeddingClient`] seam
//! - [`index`]: the [`index::VectorIndexClient`] seam and its backends
//! - [`retrieval`]: narrative to ranked references, plus the background cache
//! - [`projection`]: standardize + PCA to 3-D points
//! - [`pipeline`]: per-session orchestration with result memoization
//! - [`collaborators`]: captioning, poem generation, and speech

pub mod collaborators;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod projection;
pub mod retrieval;
