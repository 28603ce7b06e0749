#![forbid(unsafe_code)]

mod error;
mod monitor;
mod pool;
mod pressure;
mod window;

pub use error::Error;
pub use monitor::MonitorSettings;
pub use pool::PoolSettings;
pub use pressure::PressureSettings;
pub use window::WindowSettings;

use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pool: PoolSettings,
    pub monitor: MonitorSettings,
    pub pressure: PressureSettings,
    pub window: WindowSettings,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file, merged over the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the effective configuration as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, Error> {
        Ok(toml_edit::ser::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.pool.validate()?;
        self.monitor.validate()?;
        self.pressure.validate()?;
        self.window.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::new();
        config.validate().unwrap();
        assert_eq!(config.pool.priority_levels, 4);
        assert_eq!(config.pool.anti_starvation_interval, 8);
    }

    #[test]
    fn load_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[pool]\nmax_workers = 16\n\n[window]\nchunk_size = 4096\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pool.max_workers, 16);
        assert_eq!(config.window.chunk_size, 4096);
        // untouched sections keep their defaults
        assert_eq!(config.pool.min_workers, 1);
        assert_eq!(config.monitor.history_size, 16);
    }

    #[test]
    fn load_rejects_inverted_worker_bounds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[pool]\nmin_workers = 8\nmax_workers = 2\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn toml_round_trip() {
        let config = Config::new();
        let toml = config.to_toml_string().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        let reloaded = Config::load(file.path()).unwrap();

        assert_eq!(config, reloaded);
    }
}
