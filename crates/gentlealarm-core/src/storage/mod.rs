mod config;
mod database;

pub use config::{Config, DefaultsConfig, KeepAliveConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::{CoreError, Result};

/// Returns `~/.config/gentlealarm[-dev]/` based on GENTLEALARM_ENV.
///
/// Set GENTLEALARM_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GENTLEALARM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("gentlealarm-dev")
    } else {
        base_dir.join("gentlealarm")
    };

    std::fs::create_dir_all(&dir).map_err(CoreError::Io)?;
    Ok(dir)
}
