#![forbid(unsafe_code)]

use crate::ResourceSnapshot;

/// Read side of resource monitoring.
///
/// The pool's adjustment loop and the manager's admission filter only ever
/// read snapshots, so they take this trait rather than a concrete monitor.
pub trait ResourceFeed: Send + Sync {
    /// The most recent snapshot. Never blocks on I/O.
    fn latest(&self) -> ResourceSnapshot;

    /// Up to the last `n` snapshots, oldest first.
    fn history(&self, n: usize) -> Vec<ResourceSnapshot>;
}

/// A feed that always reports the same utilization.
///
/// Useful where adaptivity is not wanted and as a test stand-in.
#[derive(Debug, Clone)]
pub struct FixedFeed {
    snapshot: ResourceSnapshot,
}

impl FixedFeed {
    pub fn new(cpu_percent: f32, memory_used_bytes: u64, memory_total_bytes: u64) -> Self {
        Self {
            snapshot: ResourceSnapshot {
                cpu_percent,
                memory_used_bytes,
                memory_total_bytes,
                timestamp: std::time::Instant::now(),
            },
        }
    }

    /// A feed reporting an idle machine.
    pub fn idle() -> Self {
        Self::new(0.0, 0, 0)
    }
}

impl ResourceFeed for FixedFeed {
    fn latest(&self) -> ResourceSnapshot {
        self.snapshot
    }

    fn history(&self, n: usize) -> Vec<ResourceSnapshot> {
        vec![self.snapshot; n.min(1)]
    }
}
