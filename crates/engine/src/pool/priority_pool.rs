#![forbid(unsafe_code)]

use crate::Error;
use crate::pool::lanes::Lanes;
use crate::pool::{Job, PoolMetrics};
use config::{PoolSettings, PressureSettings};
use monitor::ResourceFeed;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

/// Bounded worker pool with priority lanes and pressure-driven sizing.
///
/// Workers are tokio tasks pulling from the lowest-numbered non-empty lane,
/// with a periodic override that services the lowest-priority lane. A
/// background adjustment task grows or shrinks the worker count by at most
/// one per tick, keeping it inside `[min_workers, max_workers]`.
///
/// Must be constructed inside a tokio runtime.
pub struct PriorityPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    settings: PoolSettings,
    pressure: PressureSettings,
    lanes: Lanes,
    jobs_ready: Notify,
    shutdown: CancellationToken,
    accepting: AtomicBool,
    tracker: TaskTracker,
    workers: AtomicUsize,
    target_workers: AtomicUsize,
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl PriorityPool {
    pub fn new(
        settings: PoolSettings,
        pressure: PressureSettings,
        feed: Arc<dyn ResourceFeed>,
    ) -> Self {
        let lanes = Lanes::new(
            settings.priority_levels as usize,
            settings.queue_capacity_per_lane,
            settings.anti_starvation_interval,
        );
        let initial = settings.initial_workers as usize;

        let inner = Arc::new(PoolInner {
            settings,
            pressure: pressure.clamp(),
            lanes,
            jobs_ready: Notify::new(),
            shutdown: CancellationToken::new(),
            accepting: AtomicBool::new(true),
            tracker: TaskTracker::new(),
            workers: AtomicUsize::new(0),
            target_workers: AtomicUsize::new(initial),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        });

        for _ in 0..initial {
            inner.spawn_worker();
        }
        inner
            .tracker
            .spawn(adjustment_loop(Arc::clone(&inner), feed));

        Self { inner }
    }

    /// Enqueue a job. Non-blocking; `QueueFull` is the backpressure signal
    /// and means "drop this speculative work".
    pub fn submit(&self, job: Job) -> Result<(), Error> {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(Error::PoolClosed);
        }
        self.inner.lanes.submit(job)?;
        self.inner.submitted.fetch_add(1, Ordering::Relaxed);
        self.inner.jobs_ready.notify_one();
        Ok(())
    }

    pub fn current_workers(&self) -> usize {
        self.inner.workers.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            workers: self.inner.workers.load(Ordering::SeqCst),
            queued_per_lane: self.inner.lanes.depths(),
            submitted: self.inner.submitted.load(Ordering::Relaxed),
            completed: self.inner.completed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            cancelled: self.inner.cancelled.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting submissions and wind the pool down.
    ///
    /// With `wait = true`, returns after every job submitted before the call
    /// has completed or failed. With `wait = false`, queued-but-unstarted
    /// jobs are discarded (counted as cancelled) and only in-flight jobs run
    /// to completion.
    pub async fn shutdown(&self, wait: bool) {
        self.inner.accepting.store(false, Ordering::SeqCst);
        if !wait {
            let dropped = self.inner.lanes.drain();
            self.inner.cancelled.fetch_add(dropped, Ordering::Relaxed);
        }
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

impl PoolInner {
    fn spawn_worker(self: &Arc<Self>) {
        self.workers.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(self);
        self.tracker.spawn(worker_loop(inner));
    }

    /// Decrement the worker count if it is above both the target and the
    /// floor. Returns whether the calling worker should exit.
    fn try_retire(&self) -> bool {
        let target = self.target_workers.load(Ordering::SeqCst);
        let min = self.settings.min_workers as usize;
        self.workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |workers| {
                (workers > target && workers > min).then(|| workers - 1)
            })
            .is_ok()
    }

    async fn run_job(&self, job: Job) {
        let id = job.id;
        trace!(%id, priority = job.priority, "job started");

        // Each job runs in its own task so a panic is isolated from the
        // worker; awaiting the handle keeps concurrency bounded.
        match tokio::spawn(job.work).await {
            Ok(Ok(())) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                trace!(%id, "job completed");
            }
            Ok(Err(err)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%id, %err, "job failed");
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if err.is_panic() {
                    warn!(%id, "job panicked");
                } else {
                    warn!(%id, %err, "job aborted");
                }
            }
        }
    }
}

async fn worker_loop(inner: Arc<PoolInner>) {
    loop {
        if let Some(job) = inner.lanes.pop() {
            inner.run_job(job).await;
            continue;
        }

        // Idle. On shutdown the lanes have already been drained (no-wait)
        // or just emptied by the loop above (wait), so exiting is safe.
        if inner.shutdown.is_cancelled() {
            inner.workers.fetch_sub(1, Ordering::SeqCst);
            return;
        }
        if inner.try_retire() {
            debug!("worker retired");
            return;
        }

        tokio::select! {
            _ = inner.jobs_ready.notified() => {}
            _ = inner.shutdown.cancelled() => {}
        }
    }
}

/// Re-evaluates the worker count once per `adjustment_interval`.
///
/// Smooths over the last 3 samples; moves by a single worker per tick to
/// avoid oscillation.
async fn adjustment_loop(inner: Arc<PoolInner>, feed: Arc<dyn ResourceFeed>) {
    let mut ticker = tokio::time::interval(inner.settings.adjustment_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let history = feed.history(3);
        if history.is_empty() {
            continue;
        }
        let avg_cpu: f32 =
            history.iter().map(|s| s.cpu_percent).sum::<f32>() / history.len() as f32;
        let avg_mem: f32 =
            history.iter().map(|s| s.memory_percent()).sum::<f32>() / history.len() as f32;

        let min = inner.settings.min_workers as usize;
        let max = inner.settings.max_workers as usize;
        let workers = inner.workers.load(Ordering::SeqCst);
        let queued = inner.lanes.queued();

        if avg_cpu > inner.pressure.cpu_high_water || avg_mem > inner.pressure.mem_high_water {
            let retired = inner
                .target_workers
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |target| {
                    (target > min).then(|| target - 1)
                })
                .is_ok();
            if retired {
                debug!(avg_cpu, avg_mem, workers, "pressure high, shrinking pool");
                // wake an idle worker so it can notice the lowered target
                inner.jobs_ready.notify_one();
            }
        } else if avg_cpu < inner.pressure.cpu_low_water
            && avg_mem < inner.pressure.mem_low_water
            && queued > workers
        {
            let grown = inner
                .target_workers
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |target| {
                    (target < max).then(|| target + 1)
                })
                .is_ok();
            if grown {
                debug!(avg_cpu, avg_mem, queued, workers, "pressure low, growing pool");
                inner.spawn_worker();
            }
        }
    }
}
