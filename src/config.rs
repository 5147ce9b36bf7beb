//! Manager configuration.
//!
//! Stored as TOML with intervals in milliseconds:
//!
//! ```toml
//! controller_poll_interval = 2
//! controller_reconnect_interval = 1000
//! ```
//!
//! Missing keys fall back to their defaults, so a partial file is valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2;
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// How often open controllers are read, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub controller_poll_interval: u64,
    /// How often the device list is reconciled, in milliseconds.
    #[serde(default = "default_reconnect_interval")]
    pub controller_reconnect_interval: u64,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_reconnect_interval() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            controller_poll_interval: default_poll_interval(),
            controller_reconnect_interval: default_reconnect_interval(),
        }
    }
}

impl ManagerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.controller_poll_interval)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.controller_reconnect_interval)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Like [`ManagerConfig::load`], but a broken file is logged and replaced by defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unusable config file");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
