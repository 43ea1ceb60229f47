//! Configuration file for the binday binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use binday_scheduler::{DEFAULT_TICK, ScheduleDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn default_enabled() -> bool {
    true
}

fn default_icon_normal() -> String {
    "mdi:trash-can".to_string()
}

fn default_icon_today() -> String {
    "mdi:delete-restore".to_string()
}

fn default_icon_tomorrow() -> String {
    "mdi:delete-circle".to_string()
}

/// One configured schedule plus how it is presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(flatten)]
    pub schedule: ScheduleDefinition,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Show "on 05-Mar-2024, in 3 days" instead of a bare number.
    #[serde(default)]
    pub verbose_state: bool,
    #[serde(default = "default_icon_normal")]
    pub icon_normal: String,
    #[serde(default = "default_icon_today")]
    pub icon_today: String,
    #[serde(default = "default_icon_tomorrow")]
    pub icon_tomorrow: String,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Seconds between scheduler ticks.
    #[serde(default)]
    pub tick_interval_secs: Option<u64>,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

impl AppConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), sensors = config.sensors.len(), "loaded config");
        Ok(config)
    }

    /// Sensors with `enabled` set.
    pub fn enabled_sensors(&self) -> impl Iterator<Item = &SensorConfig> {
        self.sensors.iter().filter(|sensor| sensor.enabled)
    }

    /// Definitions of the enabled sensors, in file order.
    pub fn definitions(&self) -> Vec<ScheduleDefinition> {
        self.enabled_sensors()
            .map(|sensor| sensor.schedule.clone())
            .collect()
    }

    /// Presentation settings for the sensor called `name`.
    pub fn sensor(&self, name: &str) -> Option<&SensorConfig> {
        self.enabled_sensors()
            .find(|sensor| sensor.schedule.name == name)
    }

    /// Tick interval, with `override_secs` taking precedence over the file.
    pub fn tick_interval(&self, override_secs: Option<u64>) -> Duration {
        override_secs
            .or(self.tick_interval_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TICK)
    }
}
