//! Statement assembly
//!
//! Builds the complete parameterized statements the adapter executes. Data
//! manipulation returns written rows through `OUTPUT INSERTED.*`; identifiers
//! are quoted through `ident` and every value rides in the parameter list.

use std::collections::HashMap;

use crate::collection::AttributeDefinition;
use crate::criteria::{Criteria, WhereClause};
use crate::error::{AdapterError, Result};
use crate::sql::criteria::{push_param, tail_fragment, where_fragment};
use crate::sql::ident::{TableRef, quote_ident, validate_column};
use crate::sql::value::SqlParam;

/// A complete statement with its ordered parameters
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// INSERT one record, returning the written row
///
/// `identity_insert` wraps the statement in `SET IDENTITY_INSERT ON/OFF` so
/// an explicit value can land in an IDENTITY column. A record with no columns
/// falls back to `DEFAULT VALUES`.
pub fn insert(table: &TableRef, columns: &[(String, SqlParam)], identity_insert: bool) -> Statement {
    let mut params = Vec::new();
    let body = insert_row(table, columns, &mut params);
    Statement {
        sql: wrap_identity_insert(table, body, identity_insert),
        params,
    }
}

/// INSERT a batch of records as one multi-statement string
///
/// Each record keeps its own `OUTPUT INSERTED.*`, so the result sets come
/// back one per record, in submission order.
pub fn insert_each(
    table: &TableRef,
    records: &[Vec<(String, SqlParam)>],
    identity_insert: bool,
) -> Statement {
    let mut params = Vec::new();
    let body = records
        .iter()
        .map(|columns| insert_row(table, columns, &mut params))
        .collect::<Vec<_>>()
        .join("; ");
    Statement {
        sql: wrap_identity_insert(table, body, identity_insert),
        params,
    }
}

fn insert_row(
    table: &TableRef,
    columns: &[(String, SqlParam)],
    params: &mut Vec<SqlParam>,
) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} OUTPUT INSERTED.* DEFAULT VALUES", table);
    }

    let names = columns
        .iter()
        .map(|(column, _)| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = columns
        .iter()
        .map(|(_, param)| push_param(params, param.clone()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) OUTPUT INSERTED.* VALUES ({})",
        table, names, placeholders
    )
}

fn wrap_identity_insert(table: &TableRef, body: String, identity_insert: bool) -> String {
    if identity_insert {
        format!(
            "SET IDENTITY_INSERT {} ON; {}; SET IDENTITY_INSERT {} OFF",
            table, body, table
        )
    } else {
        body
    }
}

/// SELECT under full criteria
///
/// `default_order` stabilizes paging when no sort is given.
pub fn select(table: &TableRef, criteria: &Criteria, default_order: &str) -> Result<Statement> {
    let projection = projection(criteria)?;
    let mut params = Vec::new();
    let where_sql = where_fragment(criteria.where_clause.as_ref(), &mut params)?;
    let tail = tail_fragment(criteria, default_order)?;
    Ok(Statement {
        sql: format!("SELECT {} FROM {}{}{}", projection, table, where_sql, tail),
        params,
    })
}

fn projection(criteria: &Criteria) -> Result<String> {
    if criteria.has_aggregates() {
        let mut parts = Vec::new();
        for column in criteria.group_by.iter().flatten() {
            validate_column(column)?;
            parts.push(quote_ident(column));
        }
        for (keyword, columns) in [
            ("SUM", &criteria.sum),
            ("AVG", &criteria.average),
            ("MIN", &criteria.min),
            ("MAX", &criteria.max),
        ] {
            for column in columns.iter().flatten() {
                validate_column(column)?;
                let ident = quote_ident(column);
                parts.push(format!("{}({}) AS {}", keyword, ident, ident));
            }
        }
        return Ok(parts.join(", "));
    }

    match criteria.select.as_ref().filter(|columns| !columns.is_empty()) {
        Some(columns) => {
            let parts = columns
                .iter()
                .map(|column| {
                    validate_column(column)?;
                    Ok(quote_ident(column))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(", "))
        }
        None => Ok("*".to_string()),
    }
}

/// SELECT COUNT(*) under a where clause
pub fn count(table: &TableRef, clause: Option<&WhereClause>) -> Result<Statement> {
    let mut params = Vec::new();
    let where_sql = where_fragment(clause, &mut params)?;
    Ok(Statement {
        sql: format!("SELECT COUNT(*) AS [count] FROM {}{}", table, where_sql),
        params,
    })
}

/// SELECT just the primary-key column under a where clause
pub fn select_keys(
    table: &TableRef,
    pk_column: &str,
    clause: Option<&WhereClause>,
) -> Result<Statement> {
    validate_column(pk_column)?;
    let mut params = Vec::new();
    let where_sql = where_fragment(clause, &mut params)?;
    Ok(Statement {
        sql: format!(
            "SELECT {} FROM {}{}",
            quote_ident(pk_column),
            table,
            where_sql
        ),
        params,
    })
}

/// UPDATE rows matched by a where clause
pub fn update(
    table: &TableRef,
    set: &[(String, SqlParam)],
    clause: &WhereClause,
) -> Result<Statement> {
    if set.is_empty() {
        return Err(AdapterError::query("update requires at least one value to set"));
    }
    let mut params = Vec::new();
    let assignments = set
        .iter()
        .map(|(column, param)| {
            let placeholder = push_param(&mut params, param.clone());
            format!("{} = {}", quote_ident(column), placeholder)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let where_sql = where_fragment(Some(clause), &mut params)?;
    Ok(Statement {
        sql: format!("UPDATE {} SET {}{}", table, assignments, where_sql),
        params,
    })
}

/// DELETE rows matched by a where clause (all rows when absent)
pub fn delete(table: &TableRef, clause: Option<&WhereClause>) -> Result<Statement> {
    let mut params = Vec::new();
    let where_sql = where_fragment(clause, &mut params)?;
    Ok(Statement {
        sql: format!("DELETE FROM {}{}", table, where_sql),
        params,
    })
}

/// CREATE TABLE from attribute definitions
///
/// The primary-key attribute (when known) leads the column list; the rest
/// follow in name order so the emitted DDL is deterministic.
pub fn create_table(
    table: &TableRef,
    attributes: &HashMap<String, AttributeDefinition>,
    primary_key: Option<&str>,
) -> Statement {
    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();
    if let Some(pk) = primary_key {
        if let Some(position) = names.iter().position(|name| name.as_str() == pk) {
            let pk_name = names.remove(position);
            names.insert(0, pk_name);
        }
    }

    let columns = names
        .iter()
        .map(|name| {
            let attr = &attributes[*name];
            let column = attr.column_name.as_deref().unwrap_or(name);
            let mut definition = format!("{} ", quote_ident(column));
            if attr.auto_increment {
                definition.push_str("BIGINT IDENTITY(1,1)");
            } else {
                definition.push_str(attr.column_type.to_sql_type());
            }
            if !attr.nullable {
                definition.push_str(" NOT NULL");
            }
            if attr.unique {
                definition.push_str(" UNIQUE");
            }
            if primary_key == Some(name.as_str()) {
                definition.push_str(" PRIMARY KEY");
            }
            definition
        })
        .collect::<Vec<_>>()
        .join(", ");

    Statement {
        sql: format!("CREATE TABLE {} ({})", table, columns),
        params: Vec::new(),
    }
}

/// DROP TABLE guarded by an existence check, so dropping a missing table
/// is a no-op instead of an error
pub fn drop_table(table: &TableRef) -> Statement {
    Statement {
        sql: format!(
            "IF OBJECT_ID('{}', 'U') IS NOT NULL DROP TABLE {}",
            table, table
        ),
        params: Vec::new(),
    }
}

/// Catalog query describing a table's columns, keys, and indexes
pub fn describe(table: &TableRef) -> Statement {
    let sql = "\
SELECT c.name AS [ColumnName], \
TYPE_NAME(c.user_type_id) AS [TypeName], \
c.is_nullable AS [Nullable], \
c.is_identity AS [AutoIncrement], \
ISNULL((SELECT TOP 1 i.is_unique FROM sys.indexes i \
INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
WHERE i.object_id = t.object_id AND ic.column_id = c.column_id), 0) AS [Unique], \
ISNULL((SELECT TOP 1 i.is_primary_key FROM sys.indexes i \
INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
WHERE i.object_id = t.object_id AND ic.column_id = c.column_id), 0) AS [PrimaryKey], \
ISNULL((SELECT COUNT(*) FROM sys.index_columns ic \
WHERE ic.object_id = t.object_id AND ic.column_id = c.column_id), 0) AS [Indexed] \
FROM sys.tables t \
INNER JOIN sys.columns c ON c.object_id = t.object_id \
WHERE t.name = @P1 AND OBJECT_SCHEMA_NAME(t.object_id) = @P2"
        .to_string();
    Statement {
        sql,
        params: vec![
            SqlParam::String(table.table.clone()),
            SqlParam::String(table.schema.clone()),
        ],
    }
}
