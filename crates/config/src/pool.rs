#![forbid(unsafe_code)]

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolSettings {
    /// Lower bound on live workers.
    pub min_workers: u32,

    /// Upper bound on live workers.
    pub max_workers: u32,

    /// Workers spawned at pool construction.
    pub initial_workers: u32,

    /// Number of priority lanes; lane 0 is the most urgent.
    pub priority_levels: u32,

    /// Bounded capacity of each lane's queue.
    pub queue_capacity_per_lane: usize,

    /// How often the pool re-evaluates its worker count.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub adjustment_interval: Duration,

    /// Every K-th dispatch is forced from the lowest-priority non-empty
    /// lane. `0` disables the override.
    pub anti_starvation_interval: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 8,
            initial_workers: 2,
            priority_levels: 4,
            queue_capacity_per_lane: 64,
            adjustment_interval: Duration::from_secs(5),
            anti_starvation_interval: 8,
        }
    }
}

impl PoolSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_workers == 0 {
            return Err(Error::Invalid("pool.min_workers must be at least 1".into()));
        }
        if self.min_workers > self.max_workers {
            return Err(Error::Invalid(format!(
                "pool.min_workers ({}) exceeds pool.max_workers ({})",
                self.min_workers, self.max_workers
            )));
        }
        if !(self.min_workers..=self.max_workers).contains(&self.initial_workers) {
            return Err(Error::Invalid(format!(
                "pool.initial_workers ({}) outside [{}, {}]",
                self.initial_workers, self.min_workers, self.max_workers
            )));
        }
        if self.priority_levels == 0 {
            return Err(Error::Invalid(
                "pool.priority_levels must be at least 1".into(),
            ));
        }
        if self.queue_capacity_per_lane == 0 {
            return Err(Error::Invalid(
                "pool.queue_capacity_per_lane must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
