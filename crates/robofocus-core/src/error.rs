//! Core error types for robofocus-core.
//!
//! The session controller itself never returns these from its intent
//! methods; they surface from storage, configuration and side-effect
//! adapters, and are logged at the controller boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::SessionType;

/// Core error type for robofocus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Side-effect adapter errors
    #[error("Side effect error: {0}")]
    Effect(#[from] EffectError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored value could not be decoded
    #[error("Corrupt value under '{key}': {message}")]
    Corrupt { key: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// The session type can only change while no session is in progress.
    #[error("Cannot switch to {requested} while a {current} session is in progress")]
    SessionInProgress {
        current: SessionType,
        requested: SessionType,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors reported by side-effect coordinators (blocking, analytics,
/// notifications, rewards, widgets).
#[derive(Error, Debug)]
pub enum EffectError {
    /// The capability is not set up on this device.
    #[error("{service} is not configured")]
    NotConfigured { service: String },

    /// The capability failed while handling a request.
    #[error("{service} failed: {message}")]
    Failed { service: String, message: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EffectError {
    pub fn failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        EffectError::Failed {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_in_progress_message_names_both_types() {
        let err = ValidationError::SessionInProgress {
            current: SessionType::Pomodoro,
            requested: SessionType::Break,
        };
        assert_eq!(
            err.to_string(),
            "Cannot switch to break while a pomodoro session is in progress"
        );
    }

    #[test]
    fn effect_error_wraps_into_core_error() {
        let core: CoreError = EffectError::failed("shield", "denied").into();
        assert_eq!(core.to_string(), "Side effect error: shield failed: denied");
    }
}
