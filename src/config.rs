//! Engine configuration
//!
//! Loaded from a TOML file with built-in defaults, so a missing file is a
//! valid zero-config deployment.
//!
//! ## Loading Order
//!
//! 1. `GAUGEWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `gaugewatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Suspicious values produce non-fatal warnings; warnings never break an
//! existing config.

use std::path::Path;

use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::scheduler::{parse_time_of_day, RESET_ENABLED_KEY, RESET_TIME_KEY};
use crate::storage::{Persistence, PersistenceError};

/// Environment variable pointing at the config file.
pub const CONFIG_ENV_VAR: &str = "GAUGEWATCH_CONFIG";

/// Default config file name in the working directory.
pub const CONFIG_FILE_NAME: &str = "gaugewatch.toml";

/// A non-fatal config warning (suspicious value).
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Engine configuration root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Trailing window, in hours, for the staleness rollup.
    pub freshness_window_hours: u32,
    pub reset: ResetConfig,
}

/// Daily machine reset settings, seeded into the persisted settings at
/// startup (the settings remain the live source for the scheduler).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResetConfig {
    pub enabled: bool,
    /// Local wall-clock firing time, "HH:MM".
    pub time_of_day: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            freshness_window_hours: 24,
            reset: ResetConfig::default(),
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            time_of_day: "06:00".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Unknown keys are tolerated; missing keys take
    /// their defaults.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("could not parse engine config")
    }

    /// Load following the documented order; any failure falls back to
    /// defaults with a warning rather than aborting startup.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| std::path::PathBuf::from(CONFIG_FILE_NAME));
        Self::load_from(&path)
    }

    /// Load from an explicit path, defaulting when absent or malformed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "no config file — using built-in defaults");
            return Self::default();
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config — using defaults");
                return Self::default();
            }
        };
        match Self::from_toml_str(&raw) {
            Ok(config) => {
                info!(path = %path.display(), "engine config loaded");
                for warning in config.validate() {
                    warn!(field = %warning.field, "{}", warning.message);
                }
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config — using defaults");
                Self::default()
            }
        }
    }

    /// Range checks. Out-of-range values warn but are kept as given.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.freshness_window_hours == 0 || self.freshness_window_hours > 168 {
            warnings.push(ConfigWarning {
                field: "freshness_window_hours".to_string(),
                message: format!(
                    "{} hours is outside the expected 1–168 range",
                    self.freshness_window_hours
                ),
            });
        }
        if parse_time_of_day(&self.reset.time_of_day).is_err() {
            warnings.push(ConfigWarning {
                field: "reset.time_of_day".to_string(),
                message: format!(
                    "'{}' is not a valid HH:MM time — the scheduler will reject it",
                    self.reset.time_of_day
                ),
            });
        }
        warnings
    }

    /// The freshness window as a duration.
    pub fn freshness_window(&self) -> Duration {
        Duration::hours(i64::from(self.freshness_window_hours))
    }

    /// Write the reset schedule into the persisted settings, without
    /// overwriting values an operator already stored there.
    pub fn seed_settings(&self, persistence: &dyn Persistence) -> Result<(), PersistenceError> {
        if persistence.get_setting(RESET_ENABLED_KEY)?.is_none() {
            let enabled = if self.reset.enabled { "true" } else { "false" };
            persistence.put_setting(RESET_ENABLED_KEY, enabled)?;
        }
        if persistence.get_setting(RESET_TIME_KEY)?.is_none() {
            persistence.put_setting(RESET_TIME_KEY, &self.reset.time_of_day)?;
        }
        Ok(())
    }
}
