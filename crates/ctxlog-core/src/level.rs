//! Severity levels understood by the backend.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LoggerError;

/// Entry severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Verbose diagnostics, enabled by the development preset only.
    Debug,
    /// Normal operational entries.
    Info,
    /// Unexpected but handled conditions.
    Warn,
    /// Failures that do not stop the process.
    Error,
    /// Unrecoverable failures; the process exits after the entry is written.
    Fatal,
}

impl Level {
    /// Lowercase name, as accepted in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// `tracing` level the entry is recorded at. `tracing` stops at error, so fatal
    /// entries are recorded as errors and carry a `fatal` marker field.
    #[must_use]
    pub const fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error | Self::Fatal => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(LoggerError::InvalidLevel {
                value: value.to_string(),
            }),
        }
    }
}
