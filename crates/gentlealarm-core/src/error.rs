//! Core error types for gentlealarm-core.
//!
//! The error policy is absorb-and-log: an alarm clock must never hard-fail
//! into an unusable state, so every failure class here is handled locally
//! at the manager boundary. The hierarchy exists so call sites can say
//! precisely what went wrong before absorbing it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for gentlealarm-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Stored alarm collection is unreadable: {0}")]
    CorruptCollection(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the playback collaborator.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The requested sound asset is missing. Callers fall back to the
    /// built-in system tone rather than failing silently.
    #[error("Sound asset unavailable: {0}")]
    SoundUnavailable(String),

    #[error("Playback device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Errors from the notification-scheduling collaborator.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The user declined notification authorization. Scheduling is
    /// best-effort; the in-process keep-alive path still runs.
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Scheduling failed: {0}")]
    ScheduleFailed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::QueryFailed(err.to_string())
    }
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
