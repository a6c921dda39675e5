//! JSON value to SQL parameter coercion
//!
//! Record values arrive as JSON; the driver binds typed parameters. This
//! module reconciles the two, using the declared column type when the
//! collection descriptor has one and falling back to the JSON type when it
//! does not. A value that cannot be reconciled with its declared type is not
//! rejected: it is bound as its best-effort string form and tagged
//! `Coercion::Unknown` so callers can see that fidelity was lost.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::collection::ColumnType;

/// A typed SQL parameter ready for driver binding
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
}

/// Whether a coercion matched the declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// The value mapped cleanly onto the target type
    Typed,
    /// The value did not fit; a best-effort string form was bound instead
    Unknown,
}

/// The result of coercing one JSON value
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedValue {
    pub param: SqlParam,
    pub coercion: Coercion,
}

impl CoercedValue {
    fn typed(param: SqlParam) -> Self {
        Self {
            param,
            coercion: Coercion::Typed,
        }
    }

    fn unknown(value: &Value) -> Self {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            param: SqlParam::String(text),
            coercion: Coercion::Unknown,
        }
    }
}

/// Coerce a JSON value into a SQL parameter
///
/// `declared` is the column type from the collection descriptor, when the
/// column is declared at all. Undeclared columns coerce by JSON type alone.
pub fn prepare_value(value: &Value, declared: Option<ColumnType>) -> CoercedValue {
    if value.is_null() {
        return CoercedValue::typed(SqlParam::Null);
    }

    match declared {
        Some(ColumnType::Integer) => coerce_integer(value),
        Some(ColumnType::Float) => coerce_float(value),
        Some(ColumnType::Boolean) => coerce_boolean(value),
        Some(ColumnType::DateTime) => coerce_datetime(value),
        Some(ColumnType::String) | Some(ColumnType::Text) => coerce_string(value),
        Some(ColumnType::Json) => {
            // JSON columns store the serialized document as-is.
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            CoercedValue::typed(SqlParam::String(text))
        }
        None => coerce_untyped(value),
    }
}

fn coerce_integer(value: &Value) -> CoercedValue {
    if let Some(n) = value.as_i64() {
        return CoercedValue::typed(SqlParam::Int(n));
    }
    if let Some(f) = value.as_f64() {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            return CoercedValue::typed(SqlParam::Int(f as i64));
        }
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.trim().parse::<i64>() {
            return CoercedValue::typed(SqlParam::Int(n));
        }
    }
    if let Some(b) = value.as_bool() {
        return CoercedValue::typed(SqlParam::Int(i64::from(b)));
    }
    CoercedValue::unknown(value)
}

fn coerce_float(value: &Value) -> CoercedValue {
    if let Some(f) = value.as_f64() {
        return CoercedValue::typed(SqlParam::Float(f));
    }
    if let Some(s) = value.as_str() {
        if let Ok(f) = s.trim().parse::<f64>() {
            return CoercedValue::typed(SqlParam::Float(f));
        }
    }
    CoercedValue::unknown(value)
}

fn coerce_boolean(value: &Value) -> CoercedValue {
    if let Some(b) = value.as_bool() {
        return CoercedValue::typed(SqlParam::Bool(b));
    }
    if let Some(n) = value.as_i64() {
        return CoercedValue::typed(SqlParam::Bool(n != 0));
    }
    if let Some(s) = value.as_str() {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => return CoercedValue::typed(SqlParam::Bool(true)),
            "false" | "0" => return CoercedValue::typed(SqlParam::Bool(false)),
            _ => {}
        }
    }
    CoercedValue::unknown(value)
}

fn coerce_datetime(value: &Value) -> CoercedValue {
    if let Some(s) = value.as_str() {
        if let Some(dt) = parse_datetime(s) {
            return CoercedValue::typed(SqlParam::DateTime(dt));
        }
    }
    if let Some(millis) = value.as_i64() {
        if let Some(dt) = DateTime::from_timestamp_millis(millis) {
            return CoercedValue::typed(SqlParam::DateTime(dt));
        }
    }
    CoercedValue::unknown(value)
}

fn coerce_string(value: &Value) -> CoercedValue {
    match value {
        Value::String(s) => CoercedValue::typed(SqlParam::String(s.clone())),
        Value::Number(n) => CoercedValue::typed(SqlParam::String(n.to_string())),
        Value::Bool(b) => CoercedValue::typed(SqlParam::String(b.to_string())),
        other => CoercedValue::unknown(other),
    }
}

fn coerce_untyped(value: &Value) -> CoercedValue {
    match value {
        Value::Bool(b) => CoercedValue::typed(SqlParam::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CoercedValue::typed(SqlParam::Int(i))
            } else if let Some(f) = n.as_f64() {
                CoercedValue::typed(SqlParam::Float(f))
            } else {
                CoercedValue::unknown(value)
            }
        }
        Value::String(s) => CoercedValue::typed(SqlParam::String(s.clone())),
        _ => CoercedValue::unknown(value),
    }
}

/// Parse the datetime shapes accepted on the way in
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
        if format == "%Y-%m-%d" {
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, format) {
                return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
            }
        }
    }
    None
}
