//! Content-aware caching across pipeline sub-steps.

use crate::integration::support::fast_config;
use relic::cache::CacheManager;
use relic::config::PipelineConfig;
use relic::error::PipelineError;
use relic::pipeline::GenerationPipeline;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[tokio::test]
async fn unchanged_content_is_computed_once() {
    let pipeline = GenerationPipeline::new(fast_config());
    let calls = AtomicU32::new(0);

    for _ in 0..5 {
        let value = pipeline
            .execute_with_cache("analysis:billing", Some("function billing() {}"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("billing summary".to_string()) }
            })
            .await
            .unwrap();
        assert_eq!(value, "billing summary");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.cache_stats().await.size, 1);
}

#[tokio::test]
async fn changed_content_invalidates_and_recomputes() {
    let pipeline = GenerationPipeline::new(fast_config());
    let calls = AtomicU32::new(0);

    for content in ["function v1() {}", "function v2() {}", "function v2() {}"] {
        let _ = pipeline
            .execute_with_cache("analysis:billing", Some(content), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, PipelineError>(format!("summary of {content}")) }
            })
            .await;
    }

    // v1 computed, v2 computed, second v2 hit.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn expired_entries_recompute_after_ttl() {
    let mut config = PipelineConfig::default();
    config.cache.ttl_ms = 30;
    let pipeline = GenerationPipeline::new(config);
    let calls = AtomicU32::new(0);

    let compute = || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, PipelineError>("summary".to_string()) }
    };
    let _ = pipeline
        .execute_with_cache("analysis:a", Some("content"), compute)
        .await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    let _ = pipeline
        .execute_with_cache("analysis:a", Some("content"), compute)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn cache_errors_propagate_without_storing() {
    let mut cache: CacheManager<String> = CacheManager::new(4, Duration::from_secs(60));
    let outcome = futures::executor::block_on(cache.get_or_compute(
        "analysis:broken",
        Some("content"),
        || async { Err(PipelineError::Generation("analyzer crashed".to_string())) },
    ));
    assert!(outcome.is_err());
    assert!(!cache.has("analysis:broken"));
    assert_eq!(cache.stats().size, 0);
}
