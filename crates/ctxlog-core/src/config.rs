//! Logger configuration.
//!
//! # Design
//! - `env` is the only required setting; level and output fall back to the preset.
//! - Documents arrive as `serde_json::Value` maps or process environment variables.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{LoggerError, Result};
use crate::level::Level;

/// Environment variable holding the preset discriminator.
pub const ENV_PRESET: &str = "CTXLOG_ENV";
/// Environment variable overriding the minimum level.
pub const ENV_LEVEL: &str = "CTXLOG_LEVEL";
/// Environment variable selecting the output (`stderr`, `stdout` or a path).
pub const ENV_OUTPUT: &str = "CTXLOG_OUTPUT";

/// Where encoded entries are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Output {
    /// Standard error.
    #[default]
    Stderr,
    /// Standard output.
    Stdout,
    /// Append to a file, created if missing.
    File(PathBuf),
}

impl From<String> for Output {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "stderr" => Self::Stderr,
            "stdout" => Self::Stdout,
            _ => Self::File(PathBuf::from(value)),
        }
    }
}

/// Settings used to build the root logger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Preset discriminator (`prod`, `dev`, anything else means production).
    pub env: String,
    /// Optional minimum level overriding the preset default.
    pub level: Option<Level>,
    /// Output destination.
    pub output: Output,
}

impl LoggerConfig {
    /// Configuration selecting the given preset with default level and output.
    pub fn new(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            ..Self::default()
        }
    }

    /// Read configuration from `CTXLOG_ENV`, `CTXLOG_LEVEL` and `CTXLOG_OUTPUT`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidLevel`] when `CTXLOG_LEVEL` is set to an unknown
    /// level.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let level = lookup(ENV_LEVEL)
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.parse::<Level>())
            .transpose()?;
        Ok(Self {
            env: lookup(ENV_PRESET).unwrap_or_default(),
            level,
            output: lookup(ENV_OUTPUT).map(Output::from).unwrap_or_default(),
        })
    }
}

/// Decode a logger configuration from a JSON configuration map.
///
/// Returns `Ok(None)` when the map has no `logger` section.
///
/// # Errors
///
/// Returns [`LoggerError::InvalidConfig`] when the section is malformed.
pub fn logger_config_from_value(config: Option<&serde_json::Value>) -> Result<Option<LoggerConfig>> {
    config
        .and_then(|value| value.get("logger"))
        .map(|section| {
            LoggerConfig::deserialize(section)
                .map_err(|source| LoggerError::InvalidConfig { source })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn logger_config_from_value_parses_section() -> Result<()> {
        let config = json!({
            "logger": {"env": "dev", "level": "warn", "output": "stdout"}
        });
        let parsed = logger_config_from_value(Some(&config))?.expect("logger section");
        assert_eq!(parsed.env, "dev");
        assert_eq!(parsed.level, Some(Level::Warn));
        assert_eq!(parsed.output, Output::Stdout);
        Ok(())
    }

    #[test]
    fn logger_config_defaults_missing_keys() -> Result<()> {
        let config = json!({"logger": {}});
        let parsed = logger_config_from_value(Some(&config))?.expect("logger section");
        assert_eq!(parsed, LoggerConfig::default());
        assert!(logger_config_from_value(None)?.is_none());
        assert!(logger_config_from_value(Some(&json!({"other": 1})))?.is_none());
        Ok(())
    }

    #[test]
    fn logger_config_rejects_bad_level() {
        let config = json!({"logger": {"level": "shouting"}});
        let err = logger_config_from_value(Some(&config)).expect_err("bad level");
        assert!(matches!(err, LoggerError::InvalidConfig { .. }));
    }

    #[test]
    fn output_maps_paths_to_files() {
        assert_eq!(Output::from("stderr".to_string()), Output::Stderr);
        assert_eq!(Output::from(String::new()), Output::Stderr);
        assert_eq!(
            Output::from("/var/log/app.log".to_string()),
            Output::File(PathBuf::from("/var/log/app.log"))
        );
    }

    #[test]
    fn from_lookup_reads_environment_keys() -> Result<()> {
        let vars: HashMap<&str, &str> = [(ENV_PRESET, "prod"), (ENV_LEVEL, "error")].into();
        let config = LoggerConfig::from_lookup(|key| vars.get(key).map(ToString::to_string))?;
        assert_eq!(config.env, "prod");
        assert_eq!(config.level, Some(Level::Error));
        assert_eq!(config.output, Output::Stderr);

        let invalid: HashMap<&str, &str> = [(ENV_LEVEL, "nope")].into();
        assert!(LoggerConfig::from_lookup(|key| invalid.get(key).map(ToString::to_string)).is_err());
        Ok(())
    }
}
