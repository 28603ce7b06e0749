#![forbid(unsafe_code)]

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorSettings {
    /// Interval between resource samples.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub sampling_interval: Duration,

    /// Number of snapshots retained for smoothing decisions.
    pub history_size: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            sampling_interval: Duration::from_secs(1),
            history_size: 16,
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.history_size == 0 {
            return Err(Error::Invalid(
                "monitor.history_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
