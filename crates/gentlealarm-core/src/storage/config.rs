//! TOML-based application configuration.
//!
//! Stores defaults applied to newly created alarms and tuning for the
//! keep-alive session. Stored at `~/.config/gentlealarm/config.toml`;
//! any load failure falls back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::alarm::AlarmSound;
use crate::error::{ConfigError, Result};

use super::data_dir;

/// Defaults applied when a new alarm is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub sound: AlarmSound,
    #[serde(default = "default_fade_in_min")]
    pub fade_in_min: u32,
    #[serde(default = "default_snooze_min")]
    pub snooze_min: u32,
    #[serde(default)]
    pub failsafe_enabled: bool,
    #[serde(default = "default_failsafe_min")]
    pub failsafe_min: u32,
}

/// Keep-alive session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Poll cadence in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Application configuration, serialized to/from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
}

fn default_fade_in_min() -> u32 {
    3
}
fn default_snooze_min() -> u32 {
    5
}
fn default_failsafe_min() -> u32 {
    5
}
fn default_true() -> bool {
    true
}
fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sound: AlarmSound::default(),
            fade_in_min: default_fade_in_min(),
            snooze_min: default_snooze_min(),
            failsafe_enabled: false,
            failsafe_min: default_failsafe_min(),
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path = match Self::path() {
            Ok(path) => path,
            Err(_) => return Self::default(),
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.defaults.fade_in_min, 3);
        assert_eq!(config.defaults.snooze_min, 5);
        assert!(config.keep_alive.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[defaults]\nfade_in_min = 7\n").unwrap();
        assert_eq!(config.defaults.fade_in_min, 7);
        assert_eq!(config.defaults.snooze_min, 5);
        assert_eq!(config.keep_alive.poll_interval_ms, 250);
    }

    #[test]
    fn toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.defaults.fade_in_min, config.defaults.fade_in_min);
    }
}
