//! TOML-based application configuration.
//!
//! Stores the tunables of the tracking algorithms:
//! - Clustering gap threshold
//! - Default cycle length, forecast horizon and ovulation offset
//!
//! Configuration is stored at `~/.config/cycletrack/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::episode::{EpisodeClusterer, DEFAULT_GAP_THRESHOLD_DAYS};
use crate::error::{ConfigError, Result};
use crate::forecast::{
    CycleForecaster, DEFAULT_CYCLE_DAYS, DEFAULT_HORIZON, DEFAULT_OVULATION_OFFSET_DAYS,
    HISTORY_WINDOW,
};

/// Episode clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Inclusive day gap at which a date still joins a neighbouring episode
    #[serde(default = "default_gap_threshold_days")]
    pub gap_threshold_days: i64,
}

/// Forecast configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_cycle_days")]
    pub default_cycle_days: u32,
    /// Number of future periods to project
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default = "default_ovulation_offset_days")]
    pub ovulation_offset_days: i64,
    /// Most recent episodes considered (at most 4)
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/cycletrack/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

/// Upper bound for day-valued forecast settings.
const MAX_DAYS: i64 = 365;

// Default functions
fn default_gap_threshold_days() -> i64 {
    DEFAULT_GAP_THRESHOLD_DAYS
}
fn default_cycle_days() -> u32 {
    DEFAULT_CYCLE_DAYS
}
fn default_horizon() -> usize {
    DEFAULT_HORIZON
}
fn default_ovulation_offset_days() -> i64 {
    DEFAULT_OVULATION_OFFSET_DAYS
}
fn default_history_window() -> usize {
    HISTORY_WINDOW
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            gap_threshold_days: default_gap_threshold_days(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_cycle_days: default_cycle_days(),
            horizon: default_horizon(),
            ovulation_offset_days: default_ovulation_offset_days(),
            history_window: default_history_window(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Number(_) => {
                    let n = value.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("cannot parse '{value}' as integer"),
                    })?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) => {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: "cannot replace a whole section".into(),
                    }
                    .into());
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown().into())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data dir or return (and persist) defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path or return (and persist) defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to the data dir.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not parse,
    /// or the resulting config fails validation. `self` is left untouched
    /// on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the algorithms cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| -> Result<()> {
            Err(ConfigError::InvalidValue {
                key: key.into(),
                message: message.into(),
            }
            .into())
        };
        if self.clustering.gap_threshold_days < 0 {
            return invalid("clustering.gap_threshold_days", "must not be negative");
        }
        if !(1..=MAX_DAYS).contains(&i64::from(self.forecast.default_cycle_days)) {
            return invalid("forecast.default_cycle_days", "must be between 1 and 365");
        }
        if !(0..=MAX_DAYS).contains(&self.forecast.ovulation_offset_days) {
            return invalid("forecast.ovulation_offset_days", "must be between 0 and 365");
        }
        if self.forecast.horizon == 0 {
            return invalid("forecast.horizon", "must be positive");
        }
        if !(1..=HISTORY_WINDOW).contains(&self.forecast.history_window) {
            return invalid("forecast.history_window", "must be between 1 and 4");
        }
        Ok(())
    }

    pub fn clusterer(&self) -> EpisodeClusterer {
        EpisodeClusterer::with_threshold(self.clustering.gap_threshold_days)
    }

    pub fn forecaster(&self) -> CycleForecaster {
        CycleForecaster {
            default_cycle_days: self.forecast.default_cycle_days,
            horizon: self.forecast.horizon,
            ovulation_offset_days: self.forecast.ovulation_offset_days,
            history_window: self.forecast.history_window,
        }
    }
}
