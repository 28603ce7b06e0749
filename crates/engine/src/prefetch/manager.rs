#![forbid(unsafe_code)]

use crate::Error;
use crate::cache::Cache;
use crate::domain::{AccessMetadata, AccessRecord, ContentType, PrefetchCandidate};
use crate::fetch::Fetcher;
use crate::pool::{Job, PriorityPool};
use crate::prefetch::{AccessResult, EngineMetrics};
use crate::strategy::StrategyTable;
use config::Config;
use monitor::{ResourceFeed, ResourceMonitor};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, hash_map::Entry};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace};

/// The engine's front door: records accesses, predicts future ones, and
/// schedules the speculative fetches that survive admission.
///
/// One instance is constructed by the host and owns its monitor and pool;
/// there are no process-wide singletons.
pub struct PrefetchManager {
    config: Config,
    feed: Arc<dyn ResourceFeed>,
    /// Present when this manager owns (and must stop) the monitor.
    owned_monitor: Option<ResourceMonitor>,
    pool: PriorityPool,
    strategies: StrategyTable,
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn Fetcher>,
    state: Arc<SharedState>,
}

/// Shared between the caller path and job completion.
struct SharedState {
    history: Mutex<HashMap<String, AccessRecord>>,
    inflight: Mutex<HashSet<String>>,
    accesses: AtomicU64,
    scheduled: AtomicU64,
    skipped_cached: AtomicU64,
    skipped_inflight: AtomicU64,
    skipped_pressure: AtomicU64,
    skipped_queue_full: AtomicU64,
}

/// Clears the in-flight marker when the job ends, however it ends.
struct InflightGuard {
    state: Arc<SharedState>,
    id: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.state.inflight.lock().remove(&self.id);
    }
}

impl PrefetchManager {
    /// Build a manager owning a freshly-started [`ResourceMonitor`].
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: Config,
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let monitor = ResourceMonitor::new(config.monitor.history_size);
        monitor.start(config.monitor.sampling_interval);
        let feed: Arc<dyn ResourceFeed> = Arc::new(monitor.clone());
        Ok(Self::build(config, cache, fetcher, feed, Some(monitor)))
    }

    /// Build a manager on an externally-owned resource feed.
    pub fn with_feed(
        config: Config,
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn Fetcher>,
        feed: Arc<dyn ResourceFeed>,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::build(config, cache, fetcher, feed, None))
    }

    fn build(
        config: Config,
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn Fetcher>,
        feed: Arc<dyn ResourceFeed>,
        owned_monitor: Option<ResourceMonitor>,
    ) -> Self {
        let pool = PriorityPool::new(config.pool.clone(), config.pressure, Arc::clone(&feed));
        let strategies = StrategyTable::new(config.pool.priority_levels);
        Self {
            config,
            feed,
            owned_monitor,
            pool,
            strategies,
            cache,
            fetcher,
            state: Arc::new(SharedState {
                history: Mutex::new(HashMap::new()),
                inflight: Mutex::new(HashSet::new()),
                accesses: AtomicU64::new(0),
                scheduled: AtomicU64::new(0),
                skipped_cached: AtomicU64::new(0),
                skipped_inflight: AtomicU64::new(0),
                skipped_pressure: AtomicU64::new(0),
                skipped_queue_full: AtomicU64::new(0),
            }),
        }
    }

    /// Record one access, predict follow-up accesses, and schedule the
    /// candidates that pass admission.
    pub async fn record_access(
        &self,
        id: &str,
        metadata: AccessMetadata,
        sample: Option<&[u8]>,
    ) -> AccessResult {
        self.state.accesses.fetch_add(1, Ordering::Relaxed);
        let content_type = ContentType::classify(&metadata, sample);

        let record = {
            let mut history = self.state.history.lock();
            let now = Instant::now();
            match history.entry(id.to_string()) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().touch(content_type, &metadata, now);
                    entry.get().clone()
                }
                Entry::Vacant(entry) => entry
                    .insert(AccessRecord::new(id, content_type, &metadata, now))
                    .clone(),
            }
        };

        let candidates = self
            .strategies
            .select(record.content_type)
            .predict(&record, &self.config.window);

        let mut result = AccessResult::new(record.content_type);
        result.candidates = candidates.len();
        if candidates.is_empty() {
            return result;
        }

        // One snapshot per call; the breaker applies to every candidate.
        let snapshot = self.feed.latest();
        let pressure = self.config.pressure.clamp();
        let overloaded = snapshot.cpu_percent > pressure.cpu_high_water
            || snapshot.memory_percent() > pressure.mem_high_water;

        for candidate in candidates {
            self.admit(candidate, overloaded, &mut result).await;
        }

        trace!(
            id,
            content_type = ?result.content_type,
            scheduled = result.scheduled,
            skipped = result.skipped(),
            "access recorded"
        );
        result
    }

    async fn admit(
        &self,
        candidate: PrefetchCandidate,
        overloaded: bool,
        result: &mut AccessResult,
    ) {
        if self.cache.contains(&candidate.content_id).await {
            result.skipped_cached += 1;
            self.state.skipped_cached.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if self
            .state
            .inflight
            .lock()
            .contains(&candidate.content_id)
        {
            result.skipped_inflight += 1;
            self.state.skipped_inflight.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if overloaded {
            // circuit breaker: no speculative work under load
            result.skipped_pressure += 1;
            self.state.skipped_pressure.fetch_add(1, Ordering::Relaxed);
            return;
        }
        // Re-check under the same lock that marks the id, so two racing
        // record_access calls cannot both schedule it.
        if !self
            .state
            .inflight
            .lock()
            .insert(candidate.content_id.clone())
        {
            result.skipped_inflight += 1;
            self.state.skipped_inflight.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let job = self.fetch_job(&candidate);
        match self.pool.submit(job) {
            Ok(()) => {
                result.scheduled += 1;
                self.state.scheduled.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.state.inflight.lock().remove(&candidate.content_id);
                match err {
                    Error::QueueFull { priority } => {
                        result.skipped_queue_full += 1;
                        self.state.skipped_queue_full.fetch_add(1, Ordering::Relaxed);
                        debug!(id = %candidate.content_id, priority, "lane full, dropping candidate");
                    }
                    _ => {
                        result.skipped_pool_closed += 1;
                    }
                }
            }
        }
    }

    fn fetch_job(&self, candidate: &PrefetchCandidate) -> Job {
        let id = candidate.content_id.clone();
        let state = Arc::clone(&self.state);
        let cache = Arc::clone(&self.cache);
        let fetcher = Arc::clone(&self.fetcher);

        Job::new(candidate.content_id.clone(), candidate.priority, async move {
            let _guard = InflightGuard {
                state,
                id: id.clone(),
            };
            let bytes = fetcher
                .fetch(&id)
                .await
                .map_err(|source| Error::Fetch {
                    id: id.clone(),
                    source,
                })?;
            cache.put(&id, bytes).await.map_err(|source| Error::CachePut {
                id: id.clone(),
                source,
            })?;
            Ok(())
        })
    }

    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics {
            pool: self.pool.metrics(),
            accesses: self.state.accesses.load(Ordering::Relaxed),
            scheduled: self.state.scheduled.load(Ordering::Relaxed),
            skipped_cached: self.state.skipped_cached.load(Ordering::Relaxed),
            skipped_inflight: self.state.skipped_inflight.load(Ordering::Relaxed),
            skipped_pressure: self.state.skipped_pressure.load(Ordering::Relaxed),
            skipped_queue_full: self.state.skipped_queue_full.load(Ordering::Relaxed),
            tracked_records: self.state.history.lock().len(),
            inflight: self.state.inflight.lock().len(),
            resource_history: self.feed.history(self.config.monitor.history_size),
            sample_failures: self
                .owned_monitor
                .as_ref()
                .map(ResourceMonitor::sample_failures)
                .unwrap_or(0),
        }
    }

    /// Wind the engine down. `wait = true` drains queued jobs first.
    pub async fn shutdown(&self, wait: bool) {
        if let Some(monitor) = &self.owned_monitor {
            monitor.stop();
        }
        self.pool.shutdown(wait).await;
    }

    /// Non-blocking shutdown: queued jobs are discarded.
    pub async fn stop(&self) {
        self.shutdown(false).await;
    }
}
