//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session lengths and the count-up cap
//! - What the Focus Shield blocks
//! - Notification preferences
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::Presets;

/// Session lengths, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_pomodoro_minutes")]
    pub pomodoro_minutes: u64,
    #[serde(default = "default_deep_work_minutes")]
    pub deep_work_minutes: u64,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u64,
    #[serde(default = "default_countup_cap_minutes")]
    pub countup_cap_minutes: u64,
}

/// Focus Shield blocklist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl BlockingConfig {
    /// Enabled and blocking at least one thing.
    pub fn is_configured(&self) -> bool {
        self.enabled
            && !(self.apps.is_empty() && self.categories.is_empty() && self.domains.is_empty())
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Schedule a notification for when the running session ends.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_pomodoro_minutes() -> u64 {
    25
}
fn default_deep_work_minutes() -> u64 {
    50
}
fn default_break_minutes() -> u64 {
    5
}
fn default_countup_cap_minutes() -> u64 {
    6 * 60
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pomodoro_minutes: default_pomodoro_minutes(),
            deep_work_minutes: default_deep_work_minutes(),
            break_minutes: default_break_minutes(),
            countup_cap_minutes: default_countup_cap_minutes(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl TimerConfig {
    pub fn presets(&self) -> Presets {
        Presets {
            pomodoro_secs: self.pomodoro_minutes.max(1).saturating_mul(60),
            deep_work_secs: self.deep_work_minutes.max(1).saturating_mul(60),
            break_secs: self.break_minutes.max(1).saturating_mul(60),
            countup_cap_secs: self.countup_cap_minutes.max(1).saturating_mul(60),
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|e| invalid(e.to_string()))?
                            .into(),
                    ),
                    serde_json::Value::Array(_) => serde_json::Value::Array(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|v| !v.is_empty())
                            .map(|v| serde_json::Value::String(v.to_string()))
                            .collect(),
                    ),
                    serde_json::Value::Object(_) => {
                        return Err(invalid("cannot overwrite a whole section".into()))
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        Some(match val {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        })
    }

    /// Set a config value by dot-separated key, in memory only.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by dot-separated key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn presets(&self) -> Presets {
        self.timer.presets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.pomodoro_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("blocking.enabled").as_deref(), Some("false"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("timer.break_minutes", "10").unwrap();
        assert_eq!(cfg.timer.break_minutes, 10);
        assert_eq!(cfg.presets().break_secs, 600);
    }

    #[test]
    fn apply_splits_lists_on_commas() {
        let mut cfg = Config::default();
        cfg.apply("blocking.domains", "news.example, video.example").unwrap();
        assert_eq!(cfg.blocking.domains, vec!["news.example", "video.example"]);
        assert_eq!(
            cfg.get("blocking.domains").as_deref(),
            Some("news.example,video.example")
        );
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("timer.nonexistent", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        let err = cfg.apply("blocking.enabled", "not_a_bool").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(cfg.apply("timer", "5").is_err());
    }

    #[test]
    fn blocking_needs_enabled_and_targets() {
        let mut blocking = BlockingConfig::default();
        assert!(!blocking.is_configured());
        blocking.enabled = true;
        assert!(!blocking.is_configured());
        blocking.apps.push("com.example.social".into());
        assert!(blocking.is_configured());
    }

    #[test]
    fn presets_follow_timer_section() {
        let cfg = Config::default();
        let p = cfg.presets();
        assert_eq!(p.pomodoro_secs, 1500);
        assert_eq!(p.deep_work_secs, 3000);
        assert_eq!(p.countup_cap_secs, 21_600);
    }

    #[test]
    fn huge_minutes_saturate_instead_of_overflowing() {
        let mut cfg = Config::default();
        cfg.apply("timer.pomodoro_minutes", &u64::MAX.to_string()).unwrap();
        assert_eq!(cfg.presets().pomodoro_secs, u64::MAX);
        cfg.apply("timer.break_minutes", "0").unwrap();
        assert_eq!(cfg.presets().break_secs, 60);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: Config = toml::from_str("[timer]\npomodoro_minutes = 30\n").unwrap();
        assert_eq!(cfg.timer.pomodoro_minutes, 30);
        assert_eq!(cfg.timer.break_minutes, 5);
        assert!(cfg.notifications.enabled);
        assert!(!cfg.blocking.enabled);
    }

    #[test]
    fn toml_round_trip_preserves_sections() {
        let mut cfg = Config::default();
        cfg.blocking.enabled = true;
        cfg.blocking.apps = vec!["com.example.game".into()];
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.blocking.enabled);
        assert_eq!(parsed.blocking.apps, cfg.blocking.apps);
        assert_eq!(parsed.timer.pomodoro_minutes, 25);
    }
}
