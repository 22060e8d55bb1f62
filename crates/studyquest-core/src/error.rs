//! Core error types for studyquest-core.
//!
//! Every error is scoped to the single operation that raised it. None of
//! them is fatal: callers report the message and keep running.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyquest-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected locally before any backend call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Any failed HTTP call
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Authentication state errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Subject is empty or whitespace only
    #[error("subject must not be empty")]
    EmptySubject,

    /// Planned duration must be positive
    #[error("duration must be at least one minute (got {minutes})")]
    InvalidDuration { minutes: u32 },

    /// Operation requires a session but the timer is idle
    #[error("no active study session")]
    NoActiveSession,

    /// The backend already tracks a running session for this user
    #[error("session {session_id} is already active; recover or end it first")]
    SessionAlreadyActive { session_id: String },

    /// Manual end of a session shorter than the minimum needs confirmation
    #[error("session has only run {elapsed_secs}s and earns no reward; confirm to discard it")]
    ConfirmationRequired { elapsed_secs: u64 },

    /// Another start/end request for this timer has not returned yet
    #[error("another timer request is still in flight")]
    OperationInProgress,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failed HTTP calls.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection, timeout or TLS failure
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// Base URL plus path did not form a valid URL
    #[error("invalid endpoint URL '{0}'")]
    InvalidUrl(String),
}

/// A recovered session was older than the staleness threshold.
///
/// Handled automatically by ending the session; only ever logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "session {session_id} has been running for {elapsed_minutes} min \
     (threshold {threshold_minutes} min)"
)]
pub struct StaleSessionError {
    pub session_id: String,
    pub elapsed_minutes: u32,
    pub threshold_minutes: u32,
}

/// Authentication state errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No stored token
    #[error("not logged in; run `studyquest auth login` first")]
    NotLoggedIn,

    /// Stored session file could not be read or written
    #[error("failed to access auth storage at {path}: {message}")]
    Storage { path: PathBuf, message: String },
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

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be determined or created
    #[error("data directory unavailable: {0}")]
    DataDir(String),
}

impl NetworkError {
    /// Wrap a reqwest error raised while talking to `endpoint`.
    pub fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        NetworkError::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
