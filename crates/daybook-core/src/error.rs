//! Core error types for daybook-core.
//!
//! Failures in this library are deliberately quiet: a broken progress store
//! or effect sink degrades to "timer keeps running without that side
//! effect", so most of these types only surface through warn-level logs or
//! at the CLI boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for daybook-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Progress store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Progress-store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store is locked by another process
    #[error("Store is locked")]
    Locked,

    /// A stored record could not be decoded
    #[error("Corrupt record for key '{key}': {message}")]
    CorruptRecord { key: String, message: String },
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Config directory could not be resolved or created
    #[error("Failed to resolve config directory: {0}")]
    DirUnavailable(String),
}

/// Side-effect sink errors.
///
/// Sinks report failure through this type; callers swallow it. A sink that
/// cannot play a chime or pulse the haptic motor must never interrupt the
/// countdown.
#[derive(Error, Debug)]
pub enum EffectError {
    /// The underlying capability is missing on this host
    #[error("Effect unavailable: {0}")]
    Unavailable(String),

    /// The capability exists but the invocation failed
    #[error("Effect failed: {0}")]
    Failed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
