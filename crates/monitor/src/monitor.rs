#![forbid(unsafe_code)]

use crate::{ResourceFeed, ResourceSnapshot};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Samples CPU and memory utilization on a fixed interval.
///
/// A background task updates the published snapshot; readers go through
/// [`ResourceFeed`] and never touch the OS. A failed OS query keeps the
/// previous snapshot and bumps `sample_failures`: monitoring must never be
/// a source of errors for the scheduler it feeds.
#[derive(Debug, Clone)]
pub struct ResourceMonitor {
    inner: Arc<MonitorInner>,
}

#[derive(Debug)]
struct MonitorInner {
    latest: ArcSwap<ResourceSnapshot>,
    history: Mutex<VecDeque<ResourceSnapshot>>,
    history_size: usize,
    sample_failures: AtomicU64,
    // Some(token) while the sampling task is running.
    cancel: Mutex<Option<CancellationToken>>,
}

impl ResourceMonitor {
    pub fn new(history_size: usize) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                latest: ArcSwap::from_pointee(ResourceSnapshot::empty()),
                history: Mutex::new(VecDeque::with_capacity(history_size)),
                history_size: history_size.max(1),
                sample_failures: AtomicU64::new(0),
                cancel: Mutex::new(None),
            }),
        }
    }

    /// Begin background sampling. Calling while already running is a no-op.
    pub fn start(&self, interval: Duration) {
        let mut cancel = self.inner.cancel.lock();
        if cancel.is_some() {
            return;
        }
        let token = CancellationToken::new();
        *cancel = Some(token.clone());
        drop(cancel);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut sys = System::new_with_specifics(
                RefreshKind::nothing()
                    .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                    .with_memory(MemoryRefreshKind::nothing().with_ram()),
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("resource sampling stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        inner.sample(&mut sys);
                    }
                }
            }
        });
    }

    /// Terminate sampling. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(token) = self.inner.cancel.lock().take() {
            token.cancel();
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> ResourceSnapshot {
        **self.inner.latest.load()
    }

    /// Count of OS queries that failed since construction.
    pub fn sample_failures(&self) -> u64 {
        self.inner.sample_failures.load(Ordering::Relaxed)
    }
}

impl MonitorInner {
    fn sample(&self, sys: &mut System) {
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            // Query failed; keep the previous snapshot.
            self.sample_failures.fetch_add(1, Ordering::Relaxed);
            trace!("resource sample failed, keeping previous snapshot");
            return;
        }

        let snapshot = ResourceSnapshot {
            cpu_percent: sys.global_cpu_usage(),
            memory_used_bytes: sys.used_memory(),
            memory_total_bytes: total,
            timestamp: Instant::now(),
        };
        self.latest.store(Arc::new(snapshot));

        let mut history = self.history.lock();
        if history.len() == self.history_size {
            history.pop_front();
        }
        history.push_back(snapshot);
    }
}

impl ResourceFeed for ResourceMonitor {
    fn latest(&self) -> ResourceSnapshot {
        self.snapshot()
    }

    fn history(&self, n: usize) -> Vec<ResourceSnapshot> {
        let history = self.inner.history.lock();
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).copied().collect()
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_snapshots() {
        let monitor = ResourceMonitor::new(8);
        monitor.start(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;

        let snapshot = monitor.snapshot();
        assert!(snapshot.memory_total_bytes > 0);
        assert!(snapshot.memory_used_bytes > 0);

        let history = monitor.history(4);
        assert!(!history.is_empty());
        assert!(history.len() <= 4);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        monitor.stop();
        monitor.stop();
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let monitor = ResourceMonitor::new(4);
        monitor.start(Duration::from_millis(20));
        monitor.start(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // history is bounded regardless of how many times start was called
        assert!(monitor.history(usize::MAX).len() <= 4);
        monitor.stop();
    }

    #[test]
    fn empty_monitor_reports_empty_snapshot() {
        let monitor = ResourceMonitor::new(4);
        assert_eq!(monitor.snapshot().memory_total_bytes, 0);
        assert_eq!(monitor.sample_failures(), 0);
        assert!(monitor.history(3).is_empty());
    }
}
