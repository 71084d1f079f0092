//! Session-level orchestration: background -> retrieval -> projection.
//!
//! [`PipelineOrchestrator::run`] is what a front end calls once per rendered
//! narrative. The last successful result is kept so re-rendering an
//! unchanged narrative costs no network calls.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::PipelineError;
use crate::projection::{LatentProjector, ProjectedPoint};
use crate::retrieval::background::BackgroundSampleCache;
use crate::retrieval::{QueryContext, RetrievalCoordinator};

/// Everything a front end needs to render one narrative.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub query_context: QueryContext,
    /// `None` when there is nothing to draw.
    pub points: Option<Vec<ProjectedPoint>>,
}

/// Single-slot result cache keyed by narrative. A new narrative replaces the
/// slot.
#[derive(Default)]
struct ResultCache {
    entry: Option<(String, Arc<PipelineResult>)>,
}

impl ResultCache {
    fn get(&self, narrative: &str) -> Option<Arc<PipelineResult>> {
        match &self.entry {
            Some((key, result)) if key == narrative => Some(Arc::clone(result)),
            _ => None,
        }
    }

    fn put(&mut self, narrative: &str, result: Arc<PipelineResult>) {
        self.entry = Some((narrative.to_string(), result));
    }

    fn clear(&mut self) {
        self.entry = None;
    }
}

/// Per-session pipeline. The background cache is shared across sessions;
/// the result cache belongs to this one.
pub struct PipelineOrchestrator {
    retrieval: RetrievalCoordinator,
    background: Arc<BackgroundSampleCache>,
    projector: LatentProjector,
    top_k: usize,
    results: Mutex<ResultCache>,
}

impl PipelineOrchestrator {
    pub fn new(
        retrieval: RetrievalCoordinator,
        background: Arc<BackgroundSampleCache>,
        top_k: usize,
    ) -> Self {
        Self {
            retrieval,
            background,
            projector: LatentProjector::new(),
            top_k,
            results: Mutex::new(ResultCache::default()),
        }
    }

    /// Retrieve references for `narrative` and project them.
    ///
    /// Degraded retrievals are returned with `points: None` and are not
    /// cached, so the next call retries the services. A result drawn over a
    /// failed background build is returned but not cached either.
    pub async fn run(&self, narrative: &str) -> Result<Arc<PipelineResult>, PipelineError> {
        if let Some(hit) = self.cached(narrative)? {
            tracing::debug!("pipeline result served from cache");
            return Ok(hit);
        }

        let background = self.background.get().await?;
        let query_context = self.retrieval.retrieve(narrative, self.top_k).await?;
        let points = if query_context.is_degraded() {
            None
        } else {
            self.projector.project(&background, &query_context)?
        };

        let degraded = query_context.is_degraded();
        let cacheable = !degraded && !background.is_degraded();
        let result = Arc::new(PipelineResult {
            query_context,
            points,
        });

        if cacheable {
            self.results
                .lock()
                .map_err(|e| PipelineError::CacheCorrupted(format!("result cache poisoned: {e}")))?
                .put(narrative, Arc::clone(&result));
        }

        tracing::info!(
            references = result.query_context.references.len(),
            points = result.points.as_ref().map_or(0, Vec::len),
            degraded,
            cached = cacheable,
            "pipeline run complete"
        );
        Ok(result)
    }

    /// Clear this session's result and the shared background sample.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        self.results
            .lock()
            .map_err(|e| PipelineError::CacheCorrupted(format!("result cache poisoned: {e}")))?
            .clear();
        self.background.invalidate().await;
        tracing::info!("pipeline session reset");
        Ok(())
    }

    fn cached(&self, narrative: &str) -> Result<Option<Arc<PipelineResult>>, PipelineError> {
        let cache = self
            .results
            .lock()
            .map_err(|e| PipelineError::CacheCorrupted(format!("result cache poisoned: {e}")))?;
        Ok(cache.get(narrative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(narrative: &str) -> Arc<PipelineResult> {
        Arc::new(PipelineResult {
            query_context: QueryContext::degraded(narrative),
            points: None,
        })
    }

    #[test]
    fn result_cache_is_single_slot() {
        let mut cache = ResultCache::default();
        cache.put("first", result("first"));
        assert!(cache.get("first").is_some());

        cache.put("second", result("second"));
        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());

        cache.clear();
        assert!(cache.get("second").is_none());
    }
}
