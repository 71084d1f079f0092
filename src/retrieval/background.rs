//! Memoized "universe" sample that gives the projection its backdrop.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::RetrievalCoordinator;
use crate::error::PipelineError;

/// Vectors from one broad query against the corpus. Immutable once built.
#[derive(Debug, Clone)]
pub struct BackgroundSample {
    vectors: Vec<Vec<f32>>,
    degraded: bool,
}

impl BackgroundSample {
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        Self {
            vectors,
            degraded: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Stand-in for a build that failed. Empty, and anything derived from it
    /// must not be memoized.
    pub fn degraded() -> Self {
        Self {
            vectors: Vec::new(),
            degraded: true,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Builds the background sample once and hands out shared references to it.
///
/// The build holds the cell's lock for its whole duration, so concurrent
/// callers on an empty cache wait for the one in-flight build rather than
/// starting their own. A degraded build (service failure) is returned but not
/// kept, so the next call tries again.
pub struct BackgroundSampleCache {
    retrieval: RetrievalCoordinator,
    query: String,
    top_k: usize,
    cell: Mutex<Option<Arc<BackgroundSample>>>,
}

impl BackgroundSampleCache {
    pub fn new(retrieval: RetrievalCoordinator, query: impl Into<String>, top_k: usize) -> Self {
        Self {
            retrieval,
            query: query.into(),
            top_k,
            cell: Mutex::new(None),
        }
    }

    /// Return the memoized sample, building it on first use.
    pub async fn get(&self) -> Result<Arc<BackgroundSample>, PipelineError> {
        let mut cell = self.cell.lock().await;
        if let Some(sample) = cell.as_ref() {
            return Ok(Arc::clone(sample));
        }

        tracing::info!(query = %self.query, top_k = self.top_k, "cache miss: fetching background sample");
        let context = self.retrieval.retrieve(&self.query, self.top_k).await?;

        if context.is_degraded() {
            tracing::warn!("background retrieval degraded, not caching");
            return Ok(Arc::new(BackgroundSample::degraded()));
        }

        let vectors = context.references.into_iter().map(|d| d.vector).collect();
        let sample = Arc::new(BackgroundSample::new(vectors));
        tracing::info!(points = sample.len(), "background sample cached");
        *cell = Some(Arc::clone(&sample));
        Ok(sample)
    }

    /// Drop the memo; the next [`get`](Self::get) rebuilds from scratch.
    pub async fn invalidate(&self) {
        let mut cell = self.cell.lock().await;
        if cell.take().is_some() {
            tracing::info!("background sample invalidated");
        }
    }

    /// `true` when a sample is memoized. Does not wait on an in-flight build.
    pub fn is_cached(&self) -> bool {
        self.cell
            .try_lock()
            .map(|cell| cell.is_some())
            .unwrap_or(false)
    }
}
