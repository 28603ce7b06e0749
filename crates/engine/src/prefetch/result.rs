#![forbid(unsafe_code)]

use crate::domain::ContentType;
use crate::pool::PoolMetrics;
use monitor::ResourceSnapshot;

/// Outcome of one `record_access` call.
///
/// Admission-filter rejections are expected steady-state behavior, reported
/// here rather than raised as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessResult {
    pub content_type: ContentType,
    /// Candidates the strategy produced before admission filtering.
    pub candidates: usize,
    pub scheduled: usize,
    pub skipped_cached: usize,
    pub skipped_inflight: usize,
    pub skipped_pressure: usize,
    pub skipped_queue_full: usize,
    pub skipped_pool_closed: usize,
}

impl AccessResult {
    pub(crate) fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            candidates: 0,
            scheduled: 0,
            skipped_cached: 0,
            skipped_inflight: 0,
            skipped_pressure: 0,
            skipped_queue_full: 0,
            skipped_pool_closed: 0,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_cached
            + self.skipped_inflight
            + self.skipped_pressure
            + self.skipped_queue_full
            + self.skipped_pool_closed
    }
}

/// Point-in-time view of the whole engine, for dashboards and CLIs.
#[derive(Debug, Clone)]
pub struct EngineMetrics {
    pub pool: PoolMetrics,
    pub accesses: u64,
    pub scheduled: u64,
    pub skipped_cached: u64,
    pub skipped_inflight: u64,
    pub skipped_pressure: u64,
    pub skipped_queue_full: u64,
    pub tracked_records: usize,
    pub inflight: usize,
    pub resource_history: Vec<ResourceSnapshot>,
    pub sample_failures: u64,
}
