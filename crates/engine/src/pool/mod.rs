#![forbid(unsafe_code)]

mod job;
mod lanes;
mod priority_pool;

pub use job::{Job, JobFuture};
pub use priority_pool::PriorityPool;

/// Point-in-time counters for the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    pub workers: usize,
    pub queued_per_lane: Vec<usize>,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl PoolMetrics {
    pub fn queued(&self) -> usize {
        self.queued_per_lane.iter().sum()
    }
}
