mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{background_cache, coordinator, docs, MockEmbedding, MockIndex, DIMS};

#[tokio::test]
async fn first_get_builds_and_later_gets_reuse() {
    let (embedding, index) = helpers::corpus();
    let cache = background_cache(coordinator(&embedding, &index));
    assert!(!cache.is_cached());

    let first = cache.get().await.unwrap();
    assert_eq!(first.len(), 50);
    assert!(cache.is_cached());

    let second = cache.get().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(embedding.calls(), 1);
    assert_eq!(index.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_gets_share_one_build() {
    let embedding = Arc::new(MockEmbedding::new(DIMS));
    let index = Arc::new(MockIndex::new(docs(50, DIMS)).with_delay(Duration::from_millis(50)));
    let cache = background_cache(coordinator(&embedding, &index));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get().await })
        })
        .collect();

    let mut samples = Vec::new();
    for handle in handles {
        samples.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(index.calls(), 1);
    assert_eq!(embedding.calls(), 1);
    for sample in &samples[1..] {
        assert!(Arc::ptr_eq(&samples[0], sample));
    }
}

#[tokio::test]
async fn invalidate_forces_a_rebuild() {
    let (embedding, index) = helpers::corpus();
    let cache = background_cache(coordinator(&embedding, &index));

    let before = cache.get().await.unwrap();
    cache.invalidate().await;
    assert!(!cache.is_cached());

    let after = cache.get().await.unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.vectors(), before.vectors());
    assert_eq!(index.calls(), 2);
}

#[tokio::test]
async fn degraded_build_is_not_cached() {
    let (embedding, index) = helpers::corpus();
    let cache = background_cache(coordinator(&embedding, &index));

    index.set_failing(true);
    let sample = cache.get().await.unwrap();
    assert!(sample.is_empty());
    assert!(sample.is_degraded());
    assert!(!cache.is_cached());

    index.set_failing(false);
    let sample = cache.get().await.unwrap();
    assert_eq!(sample.len(), 50);
    assert!(!sample.is_degraded());
    assert_eq!(index.calls(), 2);
}
