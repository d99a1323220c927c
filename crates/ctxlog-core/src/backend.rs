//! Structured-logging backend: presets, `tracing_subscriber` formatters and outputs.
//!
//! # Design
//! - Each backend owns a private `tracing::Dispatch` built from `tracing_subscriber::fmt`:
//!   flattened JSON at `info` for production, the default human-readable formatter at
//!   `debug` for development. Nothing is installed globally, so several roots can
//!   coexist in one process.
//! - Entries are `tracing` events whose fields are the handle's fields, renamed when
//!   they would collide with a key the formatter writes itself.
//! - Output goes through `MakeWriter`, so stdio, files and in-memory buffers all work.
//!   Write failures are reported by `tracing_subscriber` and otherwise ignored.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use chrono::SecondsFormat;
use tracing::field::Value;
use tracing::{Dispatch, Event, dispatcher};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::callsite;
use crate::config::Output;
use crate::error::{LoggerError, Result};
use crate::field::{FATAL, Field, FieldValue};
use crate::level::Level;

/// Event field holding the entry message.
const MESSAGE: &str = "message";
/// Keys written by the formatters themselves, plus the fatal marker.
const RESERVED: [&str; 5] = [MESSAGE, "timestamp", "level", "target", FATAL];
/// Prefix applied to user fields that would shadow a reserved key.
const RENAMED_PREFIX: &str = "fields.";

/// Backend configuration preset selected by the environment discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// JSON lines, `info` and above.
    Production,
    /// Human-readable console lines, `debug` and above.
    Development,
}

impl Preset {
    /// Map an environment discriminator onto a preset.
    ///
    /// `"dev"` selects [`Preset::Development`]; `"prod"` and every other value select
    /// [`Preset::Production`].
    #[must_use]
    pub fn from_env(env: &str) -> Self {
        match env {
            "dev" => Self::Development,
            _ => Self::Production,
        }
    }

    /// Minimum level emitted when no override is configured.
    #[must_use]
    pub const fn default_level(self) -> Level {
        match self {
            Self::Production => Level::Info,
            Self::Development => Level::Debug,
        }
    }
}

#[derive(Clone)]
struct SharedWriter(Arc<BoxMakeWriter>);

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = Box<dyn Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        self.0.make_writer()
    }
}

/// Leveled entry writer shared by every handle derived from one root.
pub struct Backend {
    preset: Preset,
    level: Level,
    ansi: bool,
    writer: SharedWriter,
    dispatch: Dispatch,
}

impl Backend {
    /// Backend for `preset` writing to standard error.
    #[must_use]
    pub fn new(preset: Preset) -> Self {
        Self::build(
            preset,
            preset.default_level(),
            preset == Preset::Development,
            BoxMakeWriter::new(std::io::stderr),
        )
    }

    /// Backend for `preset` writing to the configured output.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::OpenOutput`] if a file output cannot be opened for
    /// appending.
    pub fn from_output(preset: Preset, output: &Output) -> Result<Self> {
        let backend = Self::new(preset);
        let backend = match output {
            Output::Stderr => backend,
            Output::Stdout => Self::build(
                preset,
                backend.level,
                backend.ansi,
                BoxMakeWriter::new(std::io::stdout),
            ),
            Output::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LoggerError::OpenOutput {
                        path: path.clone(),
                        source,
                    })?;
                backend.with_writer(Arc::new(file))
            }
        };
        Ok(backend)
    }

    /// Replace the minimum level.
    ///
    /// `tracing` has no level above error, so a `fatal` threshold filters like `error`.
    #[must_use]
    pub fn with_level(self, level: Level) -> Self {
        let writer = Arc::clone(&self.writer.0);
        Self::build_shared(self.preset, level, self.ansi, SharedWriter(writer))
    }

    /// Replace the output writer. Colour codes are disabled for custom writers.
    #[must_use]
    pub fn with_writer<W>(self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self::build(self.preset, self.level, false, BoxMakeWriter::new(writer))
    }

    fn build(preset: Preset, level: Level, ansi: bool, writer: BoxMakeWriter) -> Self {
        Self::build_shared(preset, level, ansi, SharedWriter(Arc::new(writer)))
    }

    fn build_shared(preset: Preset, level: Level, ansi: bool, writer: SharedWriter) -> Self {
        let builder = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_max_level(level.as_tracing())
            .with_ansi(ansi)
            .with_target(false)
            .with_thread_ids(false);
        let dispatch = match preset {
            Preset::Production => Dispatch::new(
                builder
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false)
                    .finish(),
            ),
            Preset::Development => Dispatch::new(builder.finish()),
        };
        Self {
            preset,
            level,
            ansi,
            writer,
            dispatch,
        }
    }

    /// Preset this backend was built from.
    #[must_use]
    pub const fn preset(&self) -> Preset {
        self.preset
    }

    /// Minimum level written.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Whether entries at `level` pass the subscriber's level filter.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        self.dispatch
            .enabled(callsite::metadata(level.as_tracing(), vec![MESSAGE]))
    }

    /// Record one entry as a `tracing` event on this backend's subscriber.
    ///
    /// Later fields replace earlier ones with the same key. Keys the formatter
    /// reserves are written as `fields.<key>`.
    pub fn write<'f, I>(&self, level: Level, message: &str, fields: I)
    where
        I: IntoIterator<Item = &'f Field>,
    {
        if !self.enabled(level) {
            return;
        }

        let mut names: Vec<&'static str> = vec![MESSAGE];
        let mut values: Vec<Box<dyn Value + '_>> = Vec::new();
        values.push(Box::new(message));
        for field in fields {
            let name = entry_name(field);
            let value = recorded(field.value());
            match names.iter().position(|existing| *existing == name) {
                Some(index) => values[index] = value,
                None => {
                    names.push(name);
                    values.push(value);
                }
            }
        }
        if level == Level::Fatal {
            names.push(FATAL);
            values.push(Box::new(true));
        }

        let metadata = callsite::metadata(level.as_tracing(), names);
        if !self.dispatch.enabled(metadata) {
            return;
        }
        let refs: Vec<Option<&dyn Value>> = values.iter().map(|value| Some(&**value)).collect();
        let value_set = metadata.fields().value_set_all(&refs);
        dispatcher::with_default(&self.dispatch, || Event::dispatch(metadata, &value_set));
    }
}

fn entry_name(field: &Field) -> &'static str {
    let key = field.static_key();
    if RESERVED.contains(&key) {
        callsite::intern(&format!("{RENAMED_PREFIX}{key}"))
    } else {
        key
    }
}

fn recorded(value: &FieldValue) -> Box<dyn Value + '_> {
    match value {
        FieldValue::Str(value) => Box::new(value.as_str()),
        FieldValue::I64(value) => Box::new(*value),
        FieldValue::U64(value) => Box::new(*value),
        FieldValue::F64(value) => Box::new(*value),
        FieldValue::Bool(value) => Box::new(*value),
        FieldValue::Duration(value) => Box::new(tracing::field::debug(*value)),
        FieldValue::Time(value) => Box::new(value.to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Backend")
            .field("preset", &self.preset)
            .field("level", &self.level)
            .field("ansi", &self.ansi)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{METHOD, STATUS};
    use ctxlog_test_support::CaptureWriter;
    use serde_json::Value as Json;
    use std::io;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(preset: Preset) -> (Backend, CaptureWriter) {
        let buffer = CaptureWriter::new();
        (Backend::new(preset).with_writer(buffer.clone()), buffer)
    }

    #[test]
    fn env_discriminator_selects_preset() {
        assert_eq!(Preset::from_env("prod"), Preset::Production);
        assert_eq!(Preset::from_env("dev"), Preset::Development);
        assert_eq!(Preset::from_env("staging"), Preset::Production);
        assert_eq!(Preset::from_env(""), Preset::Production);
    }

    #[test]
    fn production_writes_flat_json_objects() -> anyhow::Result<()> {
        let (backend, buffer) = capture(Preset::Production);
        let fields = [Field::str(METHOD, "GET"), Field::uint(STATUS, 200)];
        backend.write(Level::Info, "request completed", &fields);

        let output = buffer.contents();
        let entry: Json = serde_json::from_str(output.trim_end())?;
        let keys: Vec<&str> = entry
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();
        assert_eq!(keys, vec!["timestamp", "level", "message", "method", "status"]);
        assert_eq!(entry["level"], "INFO");
        assert_eq!(entry["message"], "request completed");
        assert_eq!(entry["status"], 200);
        Ok(())
    }

    #[test]
    fn later_fields_win_on_collision() -> anyhow::Result<()> {
        let (backend, buffer) = capture(Preset::Production);
        let fields = [Field::str(METHOD, "GET"), Field::str(METHOD, "POST")];
        backend.write(Level::Info, "entry", &fields);

        let entry: Json = serde_json::from_str(buffer.contents().trim_end())?;
        assert_eq!(entry["method"], "POST");
        Ok(())
    }

    #[test]
    fn reserved_keys_are_renamed_in_both_presets() -> anyhow::Result<()> {
        let fields = [Field::str("message", "user"), Field::str("level", "x")];

        let (backend, buffer) = capture(Preset::Production);
        backend.write(Level::Info, "real", &fields);
        let entry: Json = serde_json::from_str(buffer.contents().trim_end())?;
        assert_eq!(entry["message"], "real");
        assert_eq!(entry["level"], "INFO");
        assert_eq!(entry["fields.message"], "user");
        assert_eq!(entry["fields.level"], "x");

        let (backend, buffer) = capture(Preset::Development);
        backend.write(Level::Info, "real", &fields);
        let entries = buffer.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "real");
        assert_eq!(entries[0].str_field("fields.message"), Some("user"));
        assert_eq!(entries[0].str_field("fields.level"), Some("x"));
        Ok(())
    }

    #[test]
    fn production_filters_debug() {
        let (backend, buffer) = capture(Preset::Production);
        assert!(!backend.enabled(Level::Debug));
        backend.write(Level::Debug, "hidden", &[]);
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn development_uses_the_default_formatter() {
        let (backend, buffer) = capture(Preset::Development);
        backend.write(Level::Debug, "probe", &[Field::str(METHOD, "GET")]);

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" DEBUG probe method=\"GET\""));
        assert!(!lines[0].starts_with('{'));
    }

    #[test]
    fn level_override_applies() {
        let backend = Backend::new(Preset::Development).with_level(Level::Error);
        let buffer = CaptureWriter::new();
        let backend = backend.with_writer(buffer.clone());
        backend.write(Level::Info, "dropped", &[]);
        backend.write(Level::Error, "kept", &[]);
        assert_eq!(buffer.entries().len(), 1);
        assert_eq!(backend.level(), Level::Error);
    }

    #[test]
    fn fatal_entries_are_marked() {
        let (backend, buffer) = capture(Preset::Production);
        backend.write(Level::Fatal, "cannot start", &[]);

        let entries = buffer.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "error");
        assert_eq!(entries[0].field(FATAL), Some(&Json::Bool(true)));
    }

    #[test]
    fn failing_writer_is_tolerated() {
        let backend = Backend::new(Preset::Production).with_writer(|| Broken);
        backend.write(Level::Error, "first", &[]);
        backend.write(Level::Error, "second", &[]);
        assert!(backend.enabled(Level::Error));
    }

    #[test]
    fn file_output_reports_open_failure() {
        let output = Output::File("/nonexistent-dir/ctxlog/app.log".into());
        let err = Backend::from_output(Preset::Production, &output).expect_err("open fails");
        assert!(matches!(err, LoggerError::OpenOutput { .. }));
    }
}
