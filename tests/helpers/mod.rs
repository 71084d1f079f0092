#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ekphrasis::embedding::{EmbeddingClient, EmbeddingIntent};
use ekphrasis::error::{EmbeddingError, IndexError};
use ekphrasis::index::VectorIndexClient;
use ekphrasis::retrieval::background::BackgroundSampleCache;
use ekphrasis::retrieval::{ReferenceDocument, RetrievalCoordinator};

pub const DIMS: usize = 768;
pub const BACKGROUND_QUERY: &str = "Life Death Eternity Nature Soul Love Time";

/// The fixed query vector from the examples: `[0.1, 0.2, 0.0, ...]`.
pub fn query_vector(dims: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims];
    v[0] = 0.1;
    v[1] = 0.2;
    v
}

/// Deterministic, varied vector for document `seed`. Every dimension has some
/// spread across seeds so nothing standardizes to a constant by accident.
pub fn doc_vector(seed: usize, dims: usize) -> Vec<f32> {
    (0..dims)
        .map(|j| ((seed * 31 + j * 17 + seed * j) % 97) as f32 / 97.0 - 0.5)
        .collect()
}

pub fn doc(seed: usize, dims: usize) -> ReferenceDocument {
    ReferenceDocument {
        id: seed.to_string(),
        vector: doc_vector(seed, dims),
        text: format!("Poem text {seed}"),
        title: format!("Poem {seed}"),
        score: 1.0 - seed as f32 * 0.01,
    }
}

/// `n` documents in descending score order.
pub fn docs(n: usize, dims: usize) -> Vec<ReferenceDocument> {
    (0..n).map(|i| doc(i, dims)).collect()
}

/// Embedding double that counts calls and can be told to fail or to return
/// a vector of the wrong width.
pub struct MockEmbedding {
    dims: usize,
    output_width: usize,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockEmbedding {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            output_width: dims,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Claims `dims` but actually produces `width`-long vectors.
    pub fn misconfigured(dims: usize, width: usize) -> Self {
        Self {
            output_width: width,
            ..Self::new(dims)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbedding {
    async fn embed(&self, text: &str, _intent: EmbeddingIntent) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::InvalidResponse("service unavailable".into()));
        }
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(query_vector(self.output_width))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Index double returning a fixed ranked list, truncated to `top_k`.
pub struct MockIndex {
    matches: Vec<ReferenceDocument>,
    delay: Duration,
    calls: AtomicUsize,
    fail: AtomicBool,
    fail_next: AtomicUsize,
}

impl MockIndex {
    pub fn new(matches: Vec<ReferenceDocument>) -> Self {
        Self {
            matches,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            fail_next: AtomicUsize::new(0),
        }
    }

    /// Every search sleeps for `delay` first, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Fail only the next `n` searches, then recover.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorIndexClient for MockIndex {
    async fn search(
        &self,
        _vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ReferenceDocument>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let one_off = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if one_off || self.fail.load(Ordering::SeqCst) {
            return Err(IndexError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }
}

/// A coordinator over the given doubles, keeping handles for call counts.
pub fn coordinator(
    embedding: &Arc<MockEmbedding>,
    index: &Arc<MockIndex>,
) -> RetrievalCoordinator {
    RetrievalCoordinator::new(
        Arc::clone(embedding) as Arc<dyn EmbeddingClient>,
        Arc::clone(index) as Arc<dyn VectorIndexClient>,
    )
}

/// Doubles with a 50-document corpus at the default width.
pub fn corpus() -> (Arc<MockEmbedding>, Arc<MockIndex>) {
    (
        Arc::new(MockEmbedding::new(DIMS)),
        Arc::new(MockIndex::new(docs(50, DIMS))),
    )
}

pub fn background_cache(retrieval: RetrievalCoordinator) -> Arc<BackgroundSampleCache> {
    Arc::new(BackgroundSampleCache::new(retrieval, BACKGROUND_QUERY, 50))
}
