#![forbid(unsafe_code)]

use crate::Error;
use serde::{Deserialize, Serialize};

/// CPU/memory water marks, all in percent of capacity.
///
/// Crossing a high-water mark suppresses speculative admission and shrinks
/// the pool; staying under both low-water marks lets the pool grow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PressureSettings {
    pub cpu_high_water: f32,
    pub mem_high_water: f32,
    pub cpu_low_water: f32,
    pub mem_low_water: f32,
}

impl Default for PressureSettings {
    fn default() -> Self {
        Self {
            cpu_high_water: 80.0,
            mem_high_water: 85.0,
            cpu_low_water: 50.0,
            mem_low_water: 60.0,
        }
    }
}

impl PressureSettings {
    pub fn clamp(self) -> Self {
        Self {
            cpu_high_water: self.cpu_high_water.clamp(0.0, 100.0),
            mem_high_water: self.mem_high_water.clamp(0.0, 100.0),
            cpu_low_water: self.cpu_low_water.clamp(0.0, 100.0),
            mem_low_water: self.mem_low_water.clamp(0.0, 100.0),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.cpu_low_water >= self.cpu_high_water {
            return Err(Error::Invalid(format!(
                "pressure.cpu_low_water ({}) must be below pressure.cpu_high_water ({})",
                self.cpu_low_water, self.cpu_high_water
            )));
        }
        if self.mem_low_water >= self.mem_high_water {
            return Err(Error::Invalid(format!(
                "pressure.mem_low_water ({}) must be below pressure.mem_high_water ({})",
                self.mem_low_water, self.mem_high_water
            )));
        }
        Ok(())
    }
}
