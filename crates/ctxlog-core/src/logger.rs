//! Immutable logger handle.
//!
//! # Design
//! - A handle is a shared backend plus an `Arc<[Field]>` of attached fields.
//! - `with` copies the field list into a new handle; the receiver is never touched, so
//!   handles can be cloned across tasks without locking.
//! - Emission reads the request identifier from the caller's [`Context`] rather than
//!   taking it as an argument.

use std::fmt;
use std::sync::Arc;

use crate::backend::{Backend, Preset};
use crate::config::LoggerConfig;
use crate::context::Context;
use crate::error::Result;
use crate::field::{Field, REQUEST_ID};
use crate::level::Level;

/// Exit status used after a fatal entry.
const FATAL_EXIT_CODE: i32 = 1;

/// Cheaply cloneable, immutable structured logger.
#[derive(Clone)]
pub struct Logger {
    backend: Arc<Backend>,
    fields: Arc<[Field]>,
}

impl Logger {
    /// Build a root logger for the given environment discriminator.
    ///
    /// `"prod"` and `"dev"` select the production and development presets; any
    /// other value falls back to production.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialised.
    pub fn new(env: &str) -> Result<Self> {
        Self::from_config(&LoggerConfig::new(env))
    }

    /// Build a root logger from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured output cannot be opened.
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        let preset = Preset::from_env(&config.env);
        let mut backend = Backend::from_output(preset, &config.output)?;
        if let Some(level) = config.level {
            backend = backend.with_level(level);
        }
        tracing::debug!(?preset, level = %backend.level(), "logger backend initialised");
        Ok(Self::with_backend(backend))
    }

    /// Wrap an explicitly constructed backend.
    #[must_use]
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend: Arc::new(backend),
            fields: Arc::from(Vec::new()),
        }
    }

    /// Return a new handle with `fields` permanently attached after the existing ones.
    #[must_use]
    pub fn with<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        let merged: Vec<Field> = self.fields.iter().cloned().chain(fields).collect();
        Self {
            backend: Arc::clone(&self.backend),
            fields: Arc::from(merged),
        }
    }

    /// Fields attached to this handle, oldest first.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Preset of the shared backend.
    #[must_use]
    pub fn preset(&self) -> Preset {
        self.backend.preset()
    }

    /// Emit an entry at `level`.
    ///
    /// Attached fields come first, then `fields`, then `request_id` when one is bound
    /// in `ctx`.
    pub fn emit<I>(&self, ctx: &Context, level: Level, message: &str, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        if !self.backend.enabled(level) {
            return;
        }
        let extra: Vec<Field> = fields.into_iter().collect();
        let request_id = ctx.request_id().map(|id| Field::str(REQUEST_ID, id));
        self.backend.write(
            level,
            message,
            self.fields
                .iter()
                .chain(extra.iter())
                .chain(request_id.iter()),
        );
    }

    /// Emit at debug level.
    pub fn debug<I>(&self, ctx: &Context, message: &str, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        self.emit(ctx, Level::Debug, message, fields);
    }

    /// Emit at info level.
    pub fn info<I>(&self, ctx: &Context, message: &str, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        self.emit(ctx, Level::Info, message, fields);
    }

    /// Emit at warn level.
    pub fn warn<I>(&self, ctx: &Context, message: &str, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        self.emit(ctx, Level::Warn, message, fields);
    }

    /// Emit at error level. Execution continues.
    pub fn error<I>(&self, ctx: &Context, message: &str, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        self.emit(ctx, Level::Error, message, fields);
    }

    /// Emit at fatal level, then terminate the process.
    ///
    /// Reserved for unrecoverable startup failures.
    pub fn fatal<I>(&self, ctx: &Context, message: &str, fields: I) -> !
    where
        I: IntoIterator<Item = Field>,
    {
        self.emit(ctx, Level::Fatal, message, fields);
        std::process::exit(FATAL_EXIT_CODE)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Logger")
            .field("backend", &self.backend)
            .field("fields", &self.fields)
            .finish()
    }
}
