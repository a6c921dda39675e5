//! Record casting
//!
//! Rows come off the wire as loosely typed JSON. Casting reconciles each
//! column with its declared attribute type so callers see the types the
//! descriptor promised. Columns the descriptor does not declare pass through
//! untouched.

use serde_json::Value;

use crate::collection::{CollectionDescriptor, ColumnType};
use crate::driver::Row;
use crate::sql::value::parse_datetime;

/// A record as returned to callers
pub type Record = serde_json::Map<String, Value>;

/// Whether a value was reshaped by casting or left as received
#[derive(Debug, Clone, PartialEq)]
pub enum CastOutcome {
    Cast(Value),
    Passthrough(Value),
}

impl CastOutcome {
    /// The value regardless of provenance
    pub fn into_value(self) -> Value {
        match self {
            CastOutcome::Cast(value) | CastOutcome::Passthrough(value) => value,
        }
    }
}

/// Cast one value against an optionally declared column type
///
/// Casting is lenient: a value that cannot be reshaped comes back as
/// `Passthrough` rather than an error.
pub fn cast_value(declared: Option<ColumnType>, raw: Value) -> CastOutcome {
    if raw.is_null() {
        return CastOutcome::Cast(Value::Null);
    }

    let Some(declared) = declared else {
        return CastOutcome::Passthrough(raw);
    };

    match declared {
        ColumnType::Integer => cast_integer(raw),
        ColumnType::Float => cast_float(raw),
        ColumnType::Boolean => cast_boolean(raw),
        ColumnType::DateTime => cast_datetime(raw),
        ColumnType::String | ColumnType::Text => cast_string(raw),
        ColumnType::Json => cast_json(raw),
    }
}

fn cast_integer(raw: Value) -> CastOutcome {
    if let Some(i) = raw.as_i64() {
        return CastOutcome::Cast(Value::from(i));
    }
    if let Some(f) = raw.as_f64() {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            return CastOutcome::Cast(Value::from(f as i64));
        }
    }
    if let Some(s) = raw.as_str() {
        if let Ok(i) = s.trim().parse::<i64>() {
            return CastOutcome::Cast(Value::from(i));
        }
    }
    CastOutcome::Passthrough(raw)
}

fn cast_float(raw: Value) -> CastOutcome {
    if let Some(f) = raw.as_f64() {
        return CastOutcome::Cast(Value::from(f));
    }
    if let Some(s) = raw.as_str() {
        if let Ok(f) = s.trim().parse::<f64>() {
            return CastOutcome::Cast(Value::from(f));
        }
    }
    CastOutcome::Passthrough(raw)
}

fn cast_boolean(raw: Value) -> CastOutcome {
    if raw.is_boolean() {
        return CastOutcome::Cast(raw);
    }
    if let Some(n) = raw.as_i64() {
        return CastOutcome::Cast(Value::Bool(n != 0));
    }
    if let Some(s) = raw.as_str() {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => return CastOutcome::Cast(Value::Bool(true)),
            "false" | "0" => return CastOutcome::Cast(Value::Bool(false)),
            _ => {}
        }
    }
    CastOutcome::Passthrough(raw)
}

fn cast_datetime(raw: Value) -> CastOutcome {
    if let Some(s) = raw.as_str() {
        if let Some(dt) = parse_datetime(s) {
            return CastOutcome::Cast(Value::String(dt.to_rfc3339()));
        }
    }
    CastOutcome::Passthrough(raw)
}

fn cast_string(raw: Value) -> CastOutcome {
    match raw {
        Value::String(_) => CastOutcome::Cast(raw),
        Value::Number(n) => CastOutcome::Cast(Value::String(n.to_string())),
        Value::Bool(b) => CastOutcome::Cast(Value::String(b.to_string())),
        other => CastOutcome::Passthrough(other),
    }
}

fn cast_json(raw: Value) -> CastOutcome {
    if let Some(s) = raw.as_str() {
        if let Ok(parsed) = serde_json::from_str::<Value>(s) {
            return CastOutcome::Cast(parsed);
        }
    }
    CastOutcome::Passthrough(raw)
}

/// Cast every declared column of a row
pub(crate) fn cast_record(descriptor: &CollectionDescriptor, row: Row) -> Record {
    let mut record = Record::new();
    for (column, value) in row {
        let declared = descriptor.column_type_of(&column);
        record.insert(column, cast_value(declared, value).into_value());
    }
    record
}

/// Merge a written row over the submitted record
///
/// The database's view wins column by column, but only when the written row
/// actually carries the primary key; otherwise the submitted record stands
/// alone.
pub(crate) fn merge_generated(
    submitted: &Record,
    written: Option<&Row>,
    pk_column: &str,
) -> Record {
    let mut merged = submitted.clone();
    if let Some(written) = written {
        let has_pk = written.get(pk_column).is_some_and(|value| !value.is_null());
        if has_pk {
            for (column, value) in written {
                merged.insert(column.clone(), value.clone());
            }
        }
    }
    merged
}
