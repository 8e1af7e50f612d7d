//! Input coercion for loosely typed submissions
//!
//! Browsers and API clients send checkbox, number and date values in many
//! shapes. Each function here maps the accepted shapes onto the field's
//! canonical JSON value or reports a field-level [`CoercionError`].

use crate::metadata::value_kind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use thiserror::Error;

const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

/// Value could not be coerced to the field's type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("Expected boolean, received {0}")]
    NotBoolean(&'static str),

    #[error("Expected number, received {0}")]
    NotNumber(&'static str),

    #[error("Expected a valid date")]
    InvalidDate,
}

/// Smart boolean coercion for checkbox fields.
///
/// Native booleans pass through, `1` is true and every other number false,
/// strings are trimmed and compared case-insensitively against
/// `true`/`1`/`yes`/`on`. Any other string, including the empty one, is
/// false. `null`, arrays and objects are rejected.
pub fn coerce_bool(value: &Value) -> Result<bool, CoercionError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64() == Some(1.0)),
        Value::String(s) => {
            let normalized = s.trim().to_ascii_lowercase();
            Ok(TRUTHY.contains(&normalized.as_str()))
        }
        Value::Null | Value::Array(_) | Value::Object(_) => {
            Err(CoercionError::NotBoolean(value_kind(value)))
        }
    }
}

/// Numeric coercion. `Ok(None)` means the input was blank.
pub fn coerce_number(value: &Value) -> Result<Option<Number>, CoercionError> {
    match value {
        Value::Number(n) => Ok(Some(n.clone())),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Some(Number::from(i)));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Some)
                .ok_or(CoercionError::NotNumber("string"))
        }
        other => Err(CoercionError::NotNumber(value_kind(other))),
    }
}

/// Date coercion to an ISO-8601 string. `Ok(None)` means the input was blank.
///
/// Accepts `YYYY-MM-DD`, RFC 3339, local `YYYY-MM-DDTHH:MM[:SS]` and integer
/// epoch milliseconds.
pub fn coerce_date(value: &Value) -> Result<Option<String>, CoercionError> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_date_str(trimmed).map(Some).ok_or(CoercionError::InvalidDate)
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .ok_or(CoercionError::InvalidDate),
        _ => Err(CoercionError::InvalidDate),
    }
}

fn parse_date_str(s: &str) -> Option<String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_rfc3339());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}
