//! Wire scalar to field value coercion.

use crate::core::{RaplError, Result, ScalarType, Value};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Converts decoded wire values to the declared scalar type of a field.
pub struct WireValueConverter;

impl WireValueConverter {
    /// Coerces `json_value` to `scalar_type`.
    ///
    /// `null` stays `Value::Null`. Declared types outside the known set
    /// always produce `Value::Null`, whatever the input.
    pub fn convert(json_value: &JsonValue, scalar_type: &ScalarType) -> Result<Value> {
        match (json_value, scalar_type) {
            (_, ScalarType::Unknown(_)) => Ok(Value::Null),
            (JsonValue::Null, _) => Ok(Value::Null),

            (v, ScalarType::String) => Ok(Value::Text(to_text(v))),
            (v, ScalarType::Integer) => Ok(Value::Integer(to_integer(v))),
            (v, ScalarType::Boolean) => Ok(Value::Boolean(is_truthy(v))),

            (JsonValue::String(s), ScalarType::DateTime) => parse_datetime(s).map(Value::DateTime),
            (JsonValue::Number(n), ScalarType::DateTime) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| Value::DateTime(dt.fixed_offset()))
                .ok_or_else(|| RaplError::Decode(format!("Invalid timestamp: {}", n))),
            (other, ScalarType::DateTime) => Err(RaplError::Decode(format!(
                "Cannot convert {} to a date-time",
                other
            ))),
        }
    }
}

fn to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_integer(value: &JsonValue) -> i64 {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        JsonValue::String(s) => parse_integer_prefix(s),
        JsonValue::Bool(b) => *b as i64,
        JsonValue::Array(items) => !items.is_empty() as i64,
        JsonValue::Object(map) => !map.is_empty() as i64,
        JsonValue::Null => 0,
    }
}

// "42" -> 42, "4.9" -> 4, "12abc" -> 12, "abc" -> 0
fn parse_integer_prefix(raw: &str) -> i64 {
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return i;
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() {
            return f as i64;
        }
    }

    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|i| sign * i)
        .unwrap_or_default()
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !(s.is_empty() || s == "0" || s == "false"),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<FixedOffset>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| RaplError::Decode(format!("Invalid date-time: '{}'", raw)))
}
