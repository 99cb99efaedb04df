//! Owned SQL parameter values and the TEXT encodings for ids and times.
//!
//! Write statements travel across threads to the queue worker, so their
//! parameters must be owned (`rusqlite::types::Value`). Identifiers are
//! stored as hyphenated UUID text; timestamps as RFC 3339 UTC with a fixed
//! microsecond width so that lexicographic order equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use uuid::Uuid;

/// Encode a timestamp for storage.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Text parameter.
pub fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

/// Nullable text parameter.
pub fn opt_text(value: Option<impl Into<String>>) -> Value {
    match value {
        Some(v) => Value::Text(v.into()),
        None => Value::Null,
    }
}

/// Integer parameter.
pub fn integer(value: i64) -> Value {
    Value::Integer(value)
}

/// Boolean parameter, stored as 0/1.
pub fn boolean(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

/// UUID parameter.
pub fn uuid(value: Uuid) -> Value {
    Value::Text(value.to_string())
}

/// Nullable UUID parameter.
pub fn opt_uuid(value: Option<Uuid>) -> Value {
    match value {
        Some(v) => Value::Text(v.to_string()),
        None => Value::Null,
    }
}

/// Timestamp parameter.
pub fn timestamp(value: DateTime<Utc>) -> Value {
    Value::Text(format_ts(value))
}

/// Nullable timestamp parameter.
pub fn opt_timestamp(value: Option<DateTime<Utc>>) -> Value {
    match value {
        Some(v) => Value::Text(format_ts(v)),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_encoding_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::microseconds(1);
        assert!(format_ts(early) < format_ts(late));
    }

    #[test]
    fn timestamp_round_trip() {
        let now = Utc::now();
        let parsed = parse_ts(&format_ts(now)).unwrap();
        // RFC 3339 with microseconds truncates nanosecond precision.
        assert!((now - parsed).num_microseconds().unwrap().abs() < 1);
    }
}
