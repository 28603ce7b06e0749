#![forbid(unsafe_code)]

use crate::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowSettings {
    /// Chunk granularity in bytes for sliding-window predictions.
    pub chunk_size: u64,

    /// Number of chunks predicted ahead of the observed position.
    pub chunk_count: u32,

    /// Maximum related ids taken from a relation hint.
    pub related_limit: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            chunk_size: 256 * 1024,
            chunk_count: 4,
            related_limit: 2,
        }
    }
}

impl WindowSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_size == 0 {
            return Err(Error::Invalid("window.chunk_size must be at least 1".into()));
        }
        Ok(())
    }
}
