//! Core error types for planora-core.
//!
//! The hierarchy follows the engine's failure taxonomy: user-input problems
//! surface as [`ValidationError`], durable storage problems as
//! [`StorageError`], and server round-trips as [`ApiError`]. Only validation
//! errors ever reach the user; the rest are logged by the engine and
//! recovered locally.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for planora-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Server API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No tokio runtime was available to host the background clock or a report.
    #[error("No async runtime available: {0}")]
    Runtime(String),
}

/// Durable storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
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

    /// Data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
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

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors raised by user-facing operations.
///
/// These abort the operation without any state change.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A session cannot start without a subject.
    #[error("no subject selected")]
    NoSubjectSelected,

    /// Session configuration is frozen while a session is open.
    #[error("session configuration is locked until the current session ends")]
    ConfigLocked,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors talking to the study server.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Base URL or endpoint could not be built
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport or decoding failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success HTTP status
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Server answered `success: false`
    #[error("Server rejected request: {0}")]
    Rejected(String),

    /// Body did not match the expected envelope
    #[error("Unexpected response body: {0}")]
    InvalidResponse(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
