//! Error types for logger construction.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for logger operations.
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Errors raised while building a logger backend.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// A level string did not name a known severity.
    #[error("invalid log level")]
    InvalidLevel {
        /// Level payload provided by the caller.
        value: String,
    },
    /// The configured output file could not be opened.
    #[error("failed to open log output")]
    OpenOutput {
        /// Path that could not be opened.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration document could not be decoded.
    #[error("invalid logger configuration")]
    InvalidConfig {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}
