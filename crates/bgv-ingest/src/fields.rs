//! Field extraction shared by every source.
//!
//! Both producer and consumer applications log one JSON object per event:
//!
//! | Field       | Required | Default     | Notes                                  |
//! |-------------|----------|-------------|----------------------------------------|
//! | `seq`       | yes      |             | integer or integer-valued string       |
//! | `timestamp` | no       | Unix epoch  | RFC 3339, or naive ISO 8601 (UTC)      |
//! | `partition` | no       | `-1`        | integer or integer-valued string       |
//! | `offset`    | no       | `-1`        | integer or integer-valued string       |
//! | `group_id`  | no       | `"unknown"` | consumer only                          |
//!
//! Sources that carry their own entry timestamp (Loki) ignore `timestamp`.

use std::fmt;

use bgv_reconcile::{
    ConsumedRecord, ProducedRecord, UNKNOWN_GROUP_ID, UNKNOWN_LOCATION,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Why a single log entry could not become a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    InvalidJson(String),
    NotAnObject,
    Missing(&'static str),
    NotInteger { field: &'static str, raw: String },
    OutOfRange { field: &'static str, value: i64 },
    InvalidTimestamp(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::InvalidJson(e) => write!(f, "invalid json: {e}"),
            FieldError::NotAnObject => write!(f, "json value is not an object"),
            FieldError::Missing(field) => write!(f, "missing required field '{field}'"),
            FieldError::NotInteger { field, raw } => {
                write!(f, "field '{field}' is not an integer: {raw}")
            }
            FieldError::OutOfRange { field, value } => {
                write!(f, "field '{field}' out of range: {value}")
            }
            FieldError::InvalidTimestamp(raw) => write!(f, "invalid timestamp: {raw}"),
        }
    }
}

impl std::error::Error for FieldError {}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse one log line as a JSON object.
pub fn parse_object(line: &str) -> Result<JsonObject, FieldError> {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FieldError::NotAnObject),
        Err(e) => Err(FieldError::InvalidJson(e.to_string())),
    }
}

fn as_integer(field: &'static str, v: &Value) -> Result<i64, FieldError> {
    let parsed = match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| FieldError::NotInteger {
        field,
        raw: v.to_string(),
    })
}

/// Integer-valued floats inside the `i64` range. `as` would saturate.
fn float_to_i64(f: f64) -> Option<i64> {
    // 2^63: the first value past i64::MAX that an f64 can hold exactly.
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() != 0.0 || f < i64::MIN as f64 || f >= UPPER {
        return None;
    }
    Some(f as i64)
}

/// Required integer field.
pub fn required_int(obj: &JsonObject, field: &'static str) -> Result<i64, FieldError> {
    let v = obj.get(field).ok_or(FieldError::Missing(field))?;
    as_integer(field, v)
}

/// Optional integer field. Absent means `default`; present but not
/// integer-like is an error.
pub fn optional_int(obj: &JsonObject, field: &'static str, default: i64) -> Result<i64, FieldError> {
    match obj.get(field) {
        None => Ok(default),
        Some(v) => as_integer(field, v),
    }
}

fn partition_field(obj: &JsonObject) -> Result<i32, FieldError> {
    let value = optional_int(obj, "partition", UNKNOWN_LOCATION)?;
    i32::try_from(value).map_err(|_| FieldError::OutOfRange {
        field: "partition",
        value,
    })
}

fn group_id_field(obj: &JsonObject) -> String {
    match obj.get("group_id") {
        None | Some(Value::Null) => UNKNOWN_GROUP_ID.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 (`Z` or numeric offset). Values without an offset,
/// with or without fractional seconds, are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = s.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|n| n.and_utc())
}

/// The `timestamp` field of a log line; the Unix epoch when absent.
pub fn timestamp_field(obj: &JsonObject) -> Result<DateTime<Utc>, FieldError> {
    match obj.get("timestamp") {
        None => Ok(DateTime::<Utc>::UNIX_EPOCH),
        Some(Value::String(s)) => {
            parse_timestamp(s).ok_or_else(|| FieldError::InvalidTimestamp(s.clone()))
        }
        Some(other) => Err(FieldError::InvalidTimestamp(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Record construction
// ---------------------------------------------------------------------------

pub fn produced_from_object(
    obj: &JsonObject,
    timestamp: DateTime<Utc>,
) -> Result<ProducedRecord, FieldError> {
    Ok(ProducedRecord {
        seq: required_int(obj, "seq")?,
        timestamp,
        partition: partition_field(obj)?,
        offset: optional_int(obj, "offset", UNKNOWN_LOCATION)?,
    })
}

pub fn consumed_from_object(
    obj: &JsonObject,
    timestamp: DateTime<Utc>,
) -> Result<ConsumedRecord, FieldError> {
    Ok(ConsumedRecord {
        seq: required_int(obj, "seq")?,
        timestamp,
        partition: partition_field(obj)?,
        offset: optional_int(obj, "offset", UNKNOWN_LOCATION)?,
        group_id: group_id_field(obj),
    })
}
