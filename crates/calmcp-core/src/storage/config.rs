//! TOML-based application configuration.
//!
//! Stores:
//! - Google Calendar API root and default calendar
//! - Conflict scan defaults (thresholds, calendars, concurrency, timeout)
//! - Blocking policy for the create workflow
//!
//! Configuration is stored at `~/.config/calmcp/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::calendar::GOOGLE_CALENDAR_API;
use crate::conflict::{
    BlockingPolicy, ConflictDetectionOptions, DEFAULT_BLOCK_THRESHOLD, DEFAULT_DUPLICATE_THRESHOLD,
};
use crate::error::ConfigError;

/// Google Calendar configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_calendar")]
    pub default_calendar: String,
}

/// Conflict scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictsConfig {
    #[serde(default = "default_true")]
    pub check_duplicates: bool,
    #[serde(default = "default_true")]
    pub check_conflicts: bool,
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_similarity_threshold: f64,
    #[serde(default)]
    pub include_declined_events: bool,
    /// Calendars to scan. Empty means the target calendar only.
    #[serde(default)]
    pub calendars_to_check: Vec<String>,
    /// Calendars listed at once. 1 lists them one after another.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Upper bound for a whole scan inside the create workflow.
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
}

/// Blocking policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingConfig {
    #[serde(default = "default_true")]
    pub block_on_high_similarity: bool,
    #[serde(default = "default_block_threshold")]
    pub block_threshold: f64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/calmcp/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub conflicts: ConflictsConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
}

// Default functions
fn default_api_base_url() -> String {
    GOOGLE_CALENDAR_API.into()
}
fn default_calendar() -> String {
    "primary".into()
}
fn default_true() -> bool {
    true
}
fn default_duplicate_threshold() -> f64 {
    DEFAULT_DUPLICATE_THRESHOLD
}
fn default_block_threshold() -> f64 {
    DEFAULT_BLOCK_THRESHOLD
}
fn default_fetch_concurrency() -> usize {
    1
}
fn default_scan_timeout_secs() -> u64 {
    10
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            default_calendar: default_calendar(),
        }
    }
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            check_duplicates: true,
            check_conflicts: true,
            duplicate_similarity_threshold: default_duplicate_threshold(),
            include_declined_events: false,
            calendars_to_check: Vec::new(),
            fetch_concurrency: default_fetch_concurrency(),
            scan_timeout_secs: default_scan_timeout_secs(),
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            block_on_high_similarity: true,
            block_threshold: default_block_threshold(),
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

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Array(_) => serde_json::Value::Array(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(|s| serde_json::Value::String(s.to_string()))
                            .collect(),
                    ),
                    serde_json::Value::Object(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default on-disk location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
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
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_err = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_err(e.to_string()))?;
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

    /// Set a config value by dot-separated key. Does not save.
    ///
    /// List values are given comma-separated.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject thresholds outside [0, 1], a zero fetch concurrency and a
    /// zero scan timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |key: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{v} is outside 0..=1"),
                })
            }
        };
        unit(
            "conflicts.duplicate_similarity_threshold",
            self.conflicts.duplicate_similarity_threshold,
        )?;
        unit("blocking.block_threshold", self.blocking.block_threshold)?;
        if self.conflicts.fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "conflicts.fetch_concurrency".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.conflicts.scan_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "conflicts.scan_timeout_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn detection_options(&self) -> ConflictDetectionOptions {
        ConflictDetectionOptions {
            check_duplicates: self.conflicts.check_duplicates,
            check_conflicts: self.conflicts.check_conflicts,
            calendars_to_check: self.conflicts.calendars_to_check.clone(),
            duplicate_similarity_threshold: self.conflicts.duplicate_similarity_threshold,
            include_declined_events: self.conflicts.include_declined_events,
        }
    }

    pub fn blocking_policy(&self) -> BlockingPolicy {
        BlockingPolicy {
            block_on_high_similarity: self.blocking.block_on_high_similarity,
            block_threshold: self.blocking.block_threshold,
        }
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.conflicts.scan_timeout_secs)
    }
}
