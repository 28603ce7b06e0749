#![forbid(unsafe_code)]

use async_trait::async_trait;
use config::Config;
use engine::PrefetchManager;
use engine::cache::{Cache, MemoryCache};
use engine::domain::{AccessMetadata, ContentType};
use engine::fetch::{FetchError, Fetcher};
use monitor::{FixedFeed, ResourceFeed};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Records every fetch and trips a flag if the same id is ever in flight
/// twice at once.
struct StubFetcher {
    delay: Duration,
    fail: bool,
    calls: Mutex<Vec<String>>,
    active: Mutex<HashSet<String>>,
    overlapped: AtomicBool,
}

impl StubFetcher {
    fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            fail: false,
            calls: Mutex::new(Vec::new()),
            active: Mutex::new(HashSet::new()),
            overlapped: AtomicBool::new(false),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError> {
        if !self.active.lock().insert(id.to_string()) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.calls.lock().push(id.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.lock().remove(id);
        if self.fail {
            Err(FetchError::new("stub failure"))
        } else {
            Ok(id.as_bytes().to_vec())
        }
    }
}

fn test_config() -> Config {
    let mut config = Config::new();
    config.pool.min_workers = 1;
    config.pool.initial_workers = 2;
    config.pool.max_workers = 4;
    config.pool.adjustment_interval = Duration::from_secs(600);
    config.window.chunk_size = 100;
    config.window.chunk_count = 3;
    config
}

fn idle_feed() -> Arc<dyn ResourceFeed> {
    Arc::new(FixedFeed::idle())
}

fn video_access(position: u64, total: u64) -> AccessMetadata {
    AccessMetadata {
        name_hint: Some("vid.mkv".into()),
        size_bytes: total,
        observed_position: Some(position),
        total_size: Some(total),
        ..Default::default()
    }
}

fn doc_access(related: &[&str]) -> AccessMetadata {
    AccessMetadata {
        name_hint: Some("doc.txt".into()),
        related: related.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn video_access_prefetches_the_window() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::new());
    let manager = PrefetchManager::with_feed(
        test_config(),
        cache.clone(),
        fetcher.clone(),
        idle_feed(),
    )
    .unwrap();

    let result = manager
        .record_access("vid.mkv", video_access(250, 1000), None)
        .await;

    assert_eq!(result.content_type, ContentType::Video);
    assert_eq!(result.candidates, 3);
    assert_eq!(result.scheduled, 3);
    assert_eq!(result.skipped(), 0);

    assert!(
        wait_until(|| manager.metrics().pool.completed == 3, Duration::from_secs(2)).await,
        "window fetches never completed: {:?}",
        manager.metrics().pool
    );

    let mut calls = fetcher.calls();
    calls.sort();
    assert_eq!(calls, ["vid.mkv@300", "vid.mkv@400", "vid.mkv@500"]);
    assert!(cache.contains("vid.mkv@300").await);
    assert!(cache.contains("vid.mkv@500").await);
    assert_eq!(manager.metrics().inflight, 0);

    manager.shutdown(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cached_candidates_are_skipped() {
    let cache = Arc::new(MemoryCache::new());
    cache.put("notes/b.txt", vec![1]).await.unwrap();

    let fetcher = Arc::new(StubFetcher::new());
    let manager = PrefetchManager::with_feed(
        test_config(),
        cache.clone(),
        fetcher.clone(),
        idle_feed(),
    )
    .unwrap();

    let result = manager
        .record_access("notes/a.txt", doc_access(&["notes/b.txt"]), None)
        .await;

    assert_eq!(result.content_type, ContentType::Document);
    assert_eq!(result.candidates, 1);
    assert_eq!(result.scheduled, 0);
    assert_eq!(result.skipped_cached, 1);
    assert!(fetcher.calls().is_empty());

    manager.shutdown(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn circuit_breaker_suppresses_all_scheduling() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::new());
    // CPU way above the 80% high-water mark
    let feed: Arc<dyn ResourceFeed> = Arc::new(FixedFeed::new(99.0, 0, 0));
    let manager =
        PrefetchManager::with_feed(test_config(), cache, fetcher.clone(), feed).unwrap();

    let result = manager
        .record_access("vid.mkv", video_access(250, 1000), None)
        .await;

    assert_eq!(result.candidates, 3);
    assert_eq!(result.scheduled, 0);
    assert_eq!(result.skipped_pressure, 3);
    assert!(fetcher.calls().is_empty());

    manager.shutdown(false).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn identical_accesses_predict_identical_candidates() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::new());
    // high pressure keeps every candidate out of the pool, so both calls
    // see identical admission state
    let feed: Arc<dyn ResourceFeed> = Arc::new(FixedFeed::new(99.0, 0, 0));
    let manager =
        PrefetchManager::with_feed(test_config(), cache, fetcher, feed).unwrap();

    let first = manager
        .record_access("vid.mkv", video_access(250, 1000), None)
        .await;
    let second = manager
        .record_access("vid.mkv", video_access(250, 1000), None)
        .await;

    assert_eq!(first, second);
    assert_eq!(manager.metrics().tracked_records, 1);

    manager.shutdown(false).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn inflight_ids_are_never_fetched_concurrently() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(100)));
    let manager = PrefetchManager::with_feed(
        test_config(),
        cache.clone(),
        fetcher.clone(),
        idle_feed(),
    )
    .unwrap();

    let first = manager
        .record_access("notes/a.txt", doc_access(&["shared.txt"]), None)
        .await;
    let second = manager
        .record_access("notes/c.txt", doc_access(&["shared.txt"]), None)
        .await;

    assert_eq!(first.scheduled, 1);
    assert_eq!(second.scheduled, 0);
    assert_eq!(second.skipped_inflight, 1);

    assert!(wait_until(|| manager.metrics().pool.completed == 1, Duration::from_secs(2)).await);
    assert!(!fetcher.overlapped.load(Ordering::SeqCst));
    assert_eq!(fetcher.calls(), ["shared.txt"]);

    // completed and cached: a later access skips on the cache check instead
    let third = manager
        .record_access("notes/a.txt", doc_access(&["shared.txt"]), None)
        .await;
    assert_eq!(third.scheduled, 0);
    assert_eq!(third.skipped_cached, 1);

    manager.shutdown(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_fetches_stay_eligible_for_reprediction() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::failing());
    let manager = PrefetchManager::with_feed(
        test_config(),
        cache.clone(),
        fetcher.clone(),
        idle_feed(),
    )
    .unwrap();

    let first = manager
        .record_access("notes/a.txt", doc_access(&["missing.txt"]), None)
        .await;
    assert_eq!(first.scheduled, 1);

    assert!(wait_until(|| manager.metrics().pool.failed == 1, Duration::from_secs(2)).await);
    assert_eq!(manager.metrics().inflight, 0);
    assert!(!cache.contains("missing.txt").await);

    // no retry happened on its own; the next access schedules it again
    let second = manager
        .record_access("notes/a.txt", doc_access(&["missing.txt"]), None)
        .await;
    assert_eq!(second.scheduled, 1);

    assert!(wait_until(|| manager.metrics().pool.failed == 2, Duration::from_secs(2)).await);
    assert_eq!(fetcher.calls(), ["missing.txt", "missing.txt"]);

    manager.shutdown(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_content_is_never_prefetched() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::new());
    let manager =
        PrefetchManager::with_feed(test_config(), cache, fetcher.clone(), idle_feed()).unwrap();

    let metadata = AccessMetadata {
        // plenty of hints a strategy could use, but no classifiable type
        observed_position: Some(0),
        total_size: Some(1 << 20),
        related: vec!["other".into()],
        children: vec!["child".into()],
        ..Default::default()
    };
    let result = manager.record_access("mystery-blob", metadata, None).await;

    assert_eq!(result.content_type, ContentType::Unknown);
    assert_eq!(result.candidates, 0);
    assert_eq!(result.scheduled, 0);
    assert!(fetcher.calls().is_empty());

    manager.shutdown(false).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn directory_children_are_prefetched_in_background() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::new());
    let manager = PrefetchManager::with_feed(
        test_config(),
        cache.clone(),
        fetcher.clone(),
        idle_feed(),
    )
    .unwrap();

    let metadata = AccessMetadata {
        name_hint: Some("album.zip".into()),
        children: vec!["album/one.txt".into(), "album/two.txt".into()],
        ..Default::default()
    };
    let result = manager.record_access("album.zip", metadata, None).await;

    assert_eq!(result.content_type, ContentType::Generic);
    assert_eq!(result.candidates, 2);
    assert_eq!(result.scheduled, 2);

    assert!(wait_until(|| manager.metrics().pool.completed == 2, Duration::from_secs(2)).await);
    assert!(cache.contains("album/one.txt").await);
    assert!(cache.contains("album/two.txt").await);

    manager.shutdown(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metrics_track_engine_counters() {
    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(StubFetcher::new());
    let manager = PrefetchManager::with_feed(
        test_config(),
        cache,
        fetcher,
        idle_feed(),
    )
    .unwrap();

    manager
        .record_access("vid.mkv", video_access(0, 1000), None)
        .await;
    manager
        .record_access("notes/a.txt", doc_access(&[]), None)
        .await;

    let metrics = manager.metrics();
    assert_eq!(metrics.accesses, 2);
    assert_eq!(metrics.scheduled, 3);
    assert_eq!(metrics.tracked_records, 2);

    manager.shutdown(true).await;
}
