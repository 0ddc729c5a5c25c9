use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::maintenance::MaintenanceSettings;
use crate::maintenance::DEFAULT_MAINTENANCE_HOURS;
use crate::ticker::COUNTDOWN_TICK;
use crate::ticker::USAGE_TICK;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub maintenance: MaintenanceConfig,
    pub ticks: TickConfig,
    pub log: LogConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Falls back to the platform data directory when unset.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub duration_hours: u32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_hours: DEFAULT_MAINTENANCE_HOURS,
        }
    }
}

impl MaintenanceConfig {
    pub fn settings(&self) -> MaintenanceSettings {
        MaintenanceSettings {
            enabled: self.enabled,
            duration: chrono::Duration::hours(i64::from(self.duration_hours)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TickConfig {
    pub usage_secs: u64,
    pub countdown_secs: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            usage_secs: USAGE_TICK.as_secs(),
            countdown_secs: COUNTDOWN_TICK.as_secs(),
        }
    }
}

impl TickConfig {
    pub fn usage(&self) -> Duration {
        Duration::from_secs(self.usage_secs.max(1))
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_secs(self.countdown_secs.max(1))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
