//! Error types for lite-tie.
//!
//! Every failure of a registry or link operation is surfaced as a
//! [`TieError`]. The CLI maps each class to a process exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the lite-tie core.
#[derive(Debug, Error)]
pub enum TieError {
    // Input errors
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Invalid alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },

    #[error("Entry not found: {alias}")]
    NotFound { alias: String },

    // Link errors
    #[error("Failed to create link from {src} to {dest}: {reason}")]
    LinkCreationFailed {
        src: PathBuf,
        dest: PathBuf,
        reason: String,
    },

    // Fingerprint errors
    #[error("Failed to fingerprint {path:?}: {source}")]
    HashFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Registry document errors
    #[error("Registry {path:?} is corrupt: {message}")]
    RegistryCorrupt { path: PathBuf, message: String },

    #[error("Registry entry '{alias}' is malformed: {message}")]
    ParseFailure { alias: String, message: String },

    #[error("Failed to save registry {path:?}: {message}")]
    PersistFailure { path: PathBuf, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for lite-tie operations.
pub type Result<T> = std::result::Result<T, TieError>;

impl From<std::io::Error> for TieError {
    fn from(err: std::io::Error) -> Self {
        TieError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for TieError {
    fn from(err: serde_json::Error) -> Self {
        TieError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl TieError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        TieError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Wrap any error raised while writing the registry document.
    pub fn persist(err: TieError, path: impl Into<PathBuf>) -> Self {
        match err {
            TieError::PersistFailure { .. } => err,
            other => TieError::PersistFailure {
                path: path.into(),
                message: other.to_string(),
            },
        }
    }

    /// Convert to a process exit code.
    ///
    /// - 2: invalid input (path, alias)
    /// - 3: entry not found
    /// - 4: link artifact could not be created
    /// - 5: fingerprinting failed
    /// - 6: registry document unreadable or malformed
    /// - 7: registry document could not be written
    /// - 1: everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            TieError::InvalidPath { .. } | TieError::InvalidAlias { .. } => 2,

            TieError::NotFound { .. } => 3,

            TieError::LinkCreationFailed { .. } => 4,

            TieError::HashFailure { .. } => 5,

            TieError::RegistryCorrupt { .. } | TieError::ParseFailure { .. } => 6,

            TieError::PersistFailure { .. } => 7,

            _ => 1,
        }
    }
}
