//! SQL Server identifier handling
//!
//! Bracket-quotes identifiers, validates the names that reach SQL text, and
//! escapes LIKE patterns. Identifiers cannot be parameterized, so everything
//! interpolated into a statement goes through this module first.

use regex::Regex;

use crate::error::{AdapterError, Result};

/// Default schema when a collection does not override it
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Quote an identifier with square brackets, doubling any closing bracket
///
/// # Example
/// ```
/// use mssql_datastore::sql::quote_ident;
///
/// assert_eq!(quote_ident("orders"), "[orders]");
/// assert_eq!(quote_ident("we]ird"), "[we]]ird]");
/// ```
pub fn quote_ident(identifier: &str) -> String {
    format!("[{}]", identifier.replace(']', "]]"))
}

/// A schema-qualified table reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Render as `[schema].[table]`
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

/// Validate a column name coming from caller-supplied criteria
///
/// Quoting alone makes a name injection-safe, but criteria columns that are
/// not plain identifiers are almost always a malformed query, so reject them
/// early with a useful error.
pub fn validate_column(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AdapterError::malformed_criteria(
            "column name cannot be empty",
        ));
    }

    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| AdapterError::query(e.to_string()))?;
    if !re.is_match(name) {
        return Err(AdapterError::malformed_criteria(format!(
            "column name '{}' is invalid; expected letters, numbers, and underscores",
            name
        )));
    }

    Ok(())
}

/// Escape LIKE wildcards in a user-supplied pattern fragment
///
/// SQL Server treats `[` as the start of a character class, so it must be
/// escaped along with `%` and `_`. Escaping uses bracket classes rather than
/// an ESCAPE clause.
pub fn escape_like(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        match ch {
            '[' => out.push_str("[[]"),
            '%' => out.push_str("[%]"),
            '_' => out.push_str("[_]"),
            _ => out.push(ch),
        }
    }
    out
}
