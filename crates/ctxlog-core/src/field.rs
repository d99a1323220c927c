//! Typed key/value fields attached to log entries.
//!
//! # Design
//! - Keys are `Cow<'static, str>` so the well-known field names cost no allocation.
//! - Values are a closed enum recorded onto `tracing` events by primitive type.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Field carrying the request correlation identifier.
pub const REQUEST_ID: &str = "request_id";
/// Field carrying the HTTP method or the full RPC method name.
pub const METHOD: &str = "method";
/// Field carrying the time an RPC call was received.
pub const REQUEST_TIME: &str = "request time";
/// Field naming the component that produced the entry.
pub const COMPONENT: &str = "component";
/// Field carrying the request path.
pub const PATH: &str = "path";
/// Field carrying the peer address.
pub const REMOTE_ADDR: &str = "remote_addr";
/// Field carrying the `User-Agent` header.
pub const USER_AGENT: &str = "user_agent";
/// Field carrying the response status code.
pub const STATUS: &str = "status";
/// Field carrying the number of response body bytes written.
pub const BYTES: &str = "bytes";
/// Field carrying the elapsed handling time.
pub const DURATION: &str = "duration";
/// Field set to `true` on entries written by [`crate::Logger::fatal`].
pub const FATAL: &str = "fatal";

/// A single structured key/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: Cow<'static, str>,
    value: FieldValue,
}

/// Value half of a [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// UTF-8 string.
    Str(String),
    /// Signed integer.
    I64(i64),
    /// Unsigned integer.
    U64(u64),
    /// Floating point number.
    F64(f64),
    /// Boolean flag.
    Bool(bool),
    /// Elapsed time, rendered in human-readable form (`1.5ms`).
    Duration(Duration),
    /// Wall-clock instant, rendered as RFC 3339.
    Time(DateTime<Utc>),
}

impl Field {
    /// Build a field from any key and value.
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// String field.
    pub fn str(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Str(value.into()))
    }

    /// Signed integer field.
    pub fn int(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self::new(key, FieldValue::I64(value))
    }

    /// Unsigned integer field.
    pub fn uint(key: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Self::new(key, FieldValue::U64(value))
    }

    /// Boolean field.
    pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Self::new(key, FieldValue::Bool(value))
    }

    /// Duration field.
    pub fn duration(key: impl Into<Cow<'static, str>>, value: Duration) -> Self {
        Self::new(key, FieldValue::Duration(value))
    }

    /// Timestamp field.
    pub fn time(key: impl Into<Cow<'static, str>>, value: DateTime<Utc>) -> Self {
        Self::new(key, FieldValue::Time(value))
    }

    /// Field name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn static_key(&self) -> &'static str {
        match &self.key {
            Cow::Borrowed(key) => *key,
            Cow::Owned(key) => crate::callsite::intern(key),
        }
    }

    /// Field value.
    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }
}

impl FieldValue {
    /// JSON representation of the value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Str(value) => Value::String(value.clone()),
            Self::I64(value) => Value::from(*value),
            Self::U64(value) => Value::from(*value),
            Self::F64(value) => serde_json::Number::from_f64(*value)
                .map_or_else(|| Value::String(value.to_string()), Value::Number),
            Self::Bool(value) => Value::Bool(*value),
            Self::Duration(value) => Value::String(format!("{value:?}")),
            Self::Time(value) => {
                Value::String(value.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Value::String(value) => formatter.write_str(&value),
            other => write!(formatter, "{other}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        Self::U64(u64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Duration> for FieldValue {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duration_renders_human_readable() {
        let field = Field::duration(DURATION, Duration::from_micros(1500));
        assert_eq!(field.value().to_json(), Value::String("1.5ms".into()));
    }

    #[test]
    fn time_renders_rfc3339_utc() {
        let instant = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp");
        let field = Field::time(REQUEST_TIME, instant);
        assert_eq!(field.key(), "request time");
        assert_eq!(
            field.value().to_string(),
            "2024-05-01T12:30:00.000Z".to_string()
        );
    }

    #[test]
    fn numeric_and_bool_values_stay_typed() {
        assert_eq!(Field::uint(STATUS, 200).value().to_json(), Value::from(200));
        assert_eq!(Field::int("delta", -3).value().to_json(), Value::from(-3));
        assert_eq!(Field::bool("ok", true).value().to_json(), Value::Bool(true));
        assert_eq!(
            Field::new("ratio", f64::NAN).value().to_json(),
            Value::String("NaN".into())
        );
    }
}
