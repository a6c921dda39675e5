//! Physical schema introspection
//!
//! Normalizes the rows returned by the catalog describe query into
//! `ColumnInfo` records keyed by column name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::Row;

/// Introspected facts about one physical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Physical column name
    #[serde(rename = "columnName")]
    pub column_name: String,
    /// Database type name, e.g. `nvarchar` or `bigint`
    #[serde(rename = "typeName")]
    pub type_name: String,
    /// Whether NULL is allowed
    pub nullable: bool,
    /// Whether the column is an IDENTITY column
    #[serde(rename = "autoIncrement")]
    pub auto_increment: bool,
    /// Whether a unique index covers the column
    pub unique: bool,
    /// Whether the column participates in the primary key
    #[serde(rename = "primaryKey")]
    pub primary_key: bool,
    /// Whether any index covers the column
    pub indexed: bool,
}

/// Normalize catalog rows into a column map
///
/// The catalog query reports flags in whatever shape the server returns
/// them (BIT as bool, counts as numbers), so flag extraction is tolerant.
pub(crate) fn normalize_columns(rows: &[Row]) -> HashMap<String, ColumnInfo> {
    let mut columns = HashMap::new();
    for row in rows {
        let Some(name) = row.get("ColumnName").and_then(Value::as_str) else {
            continue;
        };
        let info = ColumnInfo {
            column_name: name.to_string(),
            type_name: row
                .get("TypeName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            nullable: truthy(row.get("Nullable")),
            auto_increment: truthy(row.get("AutoIncrement")),
            unique: truthy(row.get("Unique")),
            primary_key: truthy(row.get("PrimaryKey")),
            indexed: truthy(row.get("Indexed")),
        };
        columns.insert(name.to_string(), info);
    }
    columns
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.as_str(), "1" | "true" | "TRUE" | "True"),
        _ => false,
    }
}
