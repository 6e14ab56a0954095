//! Error types for pulse-core operations.
//!
//! Nothing here is allowed to reach the host editor as a crash: the engine
//! absorbs every variant into a log line and, where user-facing, a status update.

use std::path::PathBuf;

/// All errors that can occur while provisioning dependencies or dispatching.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    // ─────────────────────────────────────────────────────────────────────
    // Unavailable dependency
    // ─────────────────────────────────────────────────────────────────────
    #[error("No working interpreter found")]
    RuntimeNotFound,

    #[error("Automated interpreter install is not supported on {0}; install Python from https://python.org/downloads and restart the editor")]
    UnsupportedPlatform(String),

    // ─────────────────────────────────────────────────────────────────────
    // Network
    // ─────────────────────────────────────────────────────────────────────
    #[error("Request to {url} failed: {details}")]
    Network { url: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Local filesystem / archives
    // ─────────────────────────────────────────────────────────────────────
    #[error("Archive extraction failed: {path}: {details}")]
    Archive { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl TrackerError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        TrackerError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using TrackerError.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors from the `~/.wakatime.cfg` credential store.
///
/// The first three variants are the "not found" condition: a missing,
/// unreadable or keyless file never yields an empty credential.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {details}")]
    Malformed { path: PathBuf, details: String },

    #[error("api key not found in {path}")]
    KeyMissing { path: PathBuf },

    #[error("refusing to store an empty api key")]
    EmptyKey,

    #[error("could not write to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CredentialError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CredentialError::Unreadable { .. }
                | CredentialError::Malformed { .. }
                | CredentialError::KeyMissing { .. }
        )
    }
}

impl From<TrackerError> for String {
    fn from(err: TrackerError) -> String {
        err.to_string()
    }
}
