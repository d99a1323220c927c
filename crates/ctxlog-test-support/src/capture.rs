//! In-memory log writer for asserting on emitted entries.
//!
//! # Design
//! - Implements `tracing_subscriber`'s `MakeWriter` so it plugs into any backend that
//!   accepts one.
//! - Understands both `tracing_subscriber::fmt` line formats: flattened JSON objects
//!   and the default `timestamp LEVEL message key=value` lines. Keys containing spaces
//!   cannot be recovered from the latter.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer collecting every byte written through it.
#[derive(Clone, Default)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

/// One parsed log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEntry {
    /// Lowercase level name.
    pub level: String,
    /// Entry message.
    pub message: String,
    /// Structured fields, excluding level, timestamp and message.
    pub fields: Map<String, Value>,
}

impl CapturedEntry {
    /// Field value by name.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field value by name.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }
}

impl CaptureWriter {
    /// Empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        let guard = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&guard).to_string()
    }

    /// Non-empty lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Every line that parses as a JSON or console entry.
    #[must_use]
    pub fn entries(&self) -> Vec<CapturedEntry> {
        self.lines()
            .iter()
            .filter_map(|line| parse_json_line(line).or_else(|| parse_console_line(line)))
            .collect()
    }

    /// Entries whose message equals `message`.
    #[must_use]
    pub fn entries_with_message(&self, message: &str) -> Vec<CapturedEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.message == message)
            .collect()
    }
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Keys the JSON formatter writes around the event fields.
const JSON_HEADER_KEYS: [&str; 3] = ["timestamp", "level", "message"];

fn parse_json_line(line: &str) -> Option<CapturedEntry> {
    let Value::Object(mut object) = serde_json::from_str::<Value>(line).ok()? else {
        return None;
    };
    let level = object.get("level")?.as_str()?.to_ascii_lowercase();
    let message = object.get("message")?.as_str()?.to_string();
    for key in JSON_HEADER_KEYS {
        object.remove(key);
    }
    Some(CapturedEntry {
        level,
        message,
        fields: object,
    })
}

fn parse_console_line(line: &str) -> Option<CapturedEntry> {
    let (_timestamp, rest) = line.trim_start().split_once(' ')?;
    let rest = rest.trim_start();
    let (level, rest) = rest.split_once(' ').unwrap_or((rest, ""));
    if !matches!(level, "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR") {
        return None;
    }
    let rest = rest.trim_start();

    let tokens = tokenize(rest);
    let first_field = tokens
        .iter()
        .rposition(|&(start, end)| split_pair(&rest[start..end]).is_none())
        .map_or(0, |index| index + 1);
    let message_end = tokens.get(first_field).map_or(rest.len(), |&(start, _)| start);

    let mut fields = Map::new();
    for &(start, end) in &tokens[first_field..] {
        if let Some((key, raw)) = split_pair(&rest[start..end]) {
            fields.insert(key.to_string(), console_value(raw));
        }
    }
    Some(CapturedEntry {
        level: level.to_ascii_lowercase(),
        message: rest[..message_end].trim_end().to_string(),
        fields,
    })
}

/// Byte spans of space separated tokens, keeping quoted strings whole.
fn tokenize(text: &str) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut quoted = false;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if start.is_none() {
            if ch == ' ' {
                continue;
            }
            start = Some(index);
        }
        if escaped {
            escaped = false;
        } else if quoted && ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            quoted = !quoted;
        } else if ch == ' ' && !quoted {
            if let Some(begin) = start.take() {
                tokens.push((begin, index));
            }
        }
    }
    if let Some(begin) = start {
        tokens.push((begin, text.len()));
    }
    tokens
}

fn split_pair(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'));
    valid.then_some((key, value))
}

fn console_value(raw: &str) -> Value {
    if raw.starts_with('"') {
        return serde_json::from_str::<String>(raw)
            .map_or_else(|_| Value::String(raw.trim_matches('"').to_string()), Value::String);
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}
