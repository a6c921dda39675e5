//! Criteria compilation
//!
//! Turns a `Criteria` into WHERE / GROUP BY / ORDER BY / OFFSET-FETCH SQL
//! fragments plus the ordered parameter list. Values always travel as
//! parameters; only validated, bracket-quoted identifiers reach the SQL text.

use serde_json::Value;

use crate::criteria::{CompareOp, Criteria, WhereClause};
use crate::error::{AdapterError, Result};
use crate::sql::ident::{escape_like, quote_ident, validate_column};
use crate::sql::value::{SqlParam, prepare_value};

/// FETCH NEXT needs a row count even when the caller only set `skip`
const NO_LIMIT: u64 = i64::MAX as u64;

pub(crate) fn push_param(params: &mut Vec<SqlParam>, param: SqlParam) -> String {
    params.push(param);
    format!("@P{}", params.len())
}

/// Compile an optional where tree into a ` WHERE ...` fragment
///
/// Returns an empty string when there is no filter.
pub(crate) fn where_fragment(
    clause: Option<&WhereClause>,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    match clause {
        Some(clause) => Ok(format!(" WHERE {}", compile_clause(clause, params)?)),
        None => Ok(String::new()),
    }
}

fn compile_clause(clause: &WhereClause, params: &mut Vec<SqlParam>) -> Result<String> {
    match clause {
        WhereClause::And(children) => compile_group(children, " AND ", params),
        WhereClause::Or(children) => compile_group(children, " OR ", params),
        WhereClause::Compare { column, op, value } => compile_compare(column, *op, value, params),
    }
}

fn compile_group(
    children: &[WhereClause],
    joiner: &str,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    if children.is_empty() {
        return Err(AdapterError::malformed_criteria(
            "boolean group must contain at least one clause",
        ));
    }
    let parts = children
        .iter()
        .map(|child| compile_clause(child, params))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", parts.join(joiner)))
}

fn compile_compare(
    column: &str,
    op: CompareOp,
    value: &Value,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    validate_column(column)?;
    let ident = quote_ident(column);

    if value.is_null() {
        return match op {
            CompareOp::Eq => Ok(format!("{} IS NULL", ident)),
            CompareOp::Ne => Ok(format!("{} IS NOT NULL", ident)),
            _ => Err(AdapterError::malformed_criteria(format!(
                "null is only comparable with eq/ne (column '{}')",
                column
            ))),
        };
    }

    match op {
        CompareOp::Eq => binary(ident, "=", value, params),
        CompareOp::Ne => binary(ident, "<>", value, params),
        CompareOp::Lt => binary(ident, "<", value, params),
        CompareOp::Lte => binary(ident, "<=", value, params),
        CompareOp::Gt => binary(ident, ">", value, params),
        CompareOp::Gte => binary(ident, ">=", value, params),
        CompareOp::In => membership(column, ident, value, false, params),
        CompareOp::NotIn => membership(column, ident, value, true, params),
        CompareOp::Contains => like(ident, value, true, true, params),
        CompareOp::StartsWith => like(ident, value, false, true, params),
        CompareOp::EndsWith => like(ident, value, true, false, params),
    }
}

fn binary(
    ident: String,
    operator: &str,
    value: &Value,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    let placeholder = push_param(params, prepare_value(value, None).param);
    Ok(format!("{} {} {}", ident, operator, placeholder))
}

fn membership(
    column: &str,
    ident: String,
    value: &Value,
    negated: bool,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    let members = value.as_array().ok_or_else(|| {
        AdapterError::malformed_criteria(format!(
            "in/notIn on column '{}' requires an array value",
            column
        ))
    })?;

    // Empty membership sets have a fixed truth value rather than invalid SQL.
    if members.is_empty() {
        return Ok(if negated {
            "1 = 1".to_string()
        } else {
            "1 = 0".to_string()
        });
    }

    let placeholders = members
        .iter()
        .map(|member| push_param(params, prepare_value(member, None).param))
        .collect::<Vec<_>>()
        .join(", ");
    let keyword = if negated { "NOT IN" } else { "IN" };
    Ok(format!("{} {} ({})", ident, keyword, placeholders))
}

fn like(
    ident: String,
    value: &Value,
    leading: bool,
    trailing: bool,
    params: &mut Vec<SqlParam>,
) -> Result<String> {
    let fragment = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut pattern = String::new();
    if leading {
        pattern.push('%');
    }
    pattern.push_str(&escape_like(&fragment));
    if trailing {
        pattern.push('%');
    }
    let placeholder = push_param(params, SqlParam::String(pattern));
    Ok(format!("{} LIKE {}", ident, placeholder))
}

/// Compile GROUP BY / ORDER BY / OFFSET-FETCH for a select
///
/// `default_order` is the column used to stabilize paging when the caller
/// requested skip/limit without a sort. Rejects `group_by` without at least
/// one aggregate directive, since that query cannot produce well-formed rows.
pub(crate) fn tail_fragment(criteria: &Criteria, default_order: &str) -> Result<String> {
    let mut tail = String::new();

    if let Some(group_by) = criteria.group_by.as_ref().filter(|cols| !cols.is_empty()) {
        if !criteria.has_aggregates() {
            return Err(AdapterError::malformed_criteria(
                "cannot group without an aggregate directive (sum, average, min, or max)",
            ));
        }
        let columns = group_by
            .iter()
            .map(|column| {
                validate_column(column)?;
                Ok(quote_ident(column))
            })
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        tail.push_str(" GROUP BY ");
        tail.push_str(&columns);
    }

    let paging = criteria.skip.is_some() || criteria.limit.is_some();

    match criteria.sort.as_ref().filter(|keys| !keys.is_empty()) {
        Some(keys) => {
            let order = keys
                .iter()
                .map(|key| {
                    validate_column(&key.column)?;
                    Ok(format!("{} {}", quote_ident(&key.column), key.direction.as_sql()))
                })
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            tail.push_str(" ORDER BY ");
            tail.push_str(&order);
        }
        // OFFSET-FETCH is only legal after ORDER BY.
        None if paging => {
            tail.push_str(" ORDER BY ");
            tail.push_str(&default_order_columns(criteria, default_order)?);
        }
        None => {}
    }

    if paging {
        let skip = criteria.skip.unwrap_or(0);
        let limit = criteria.limit.unwrap_or(NO_LIMIT);
        tail.push_str(&format!(
            " OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            skip, limit
        ));
    }

    Ok(tail)
}

/// Default ORDER BY columns for paging without an explicit sort
///
/// An aggregate select cannot order by the key column, which is neither
/// grouped nor aggregated; it orders by the grouping columns instead, or by
/// the first aggregate alias when nothing is grouped.
fn default_order_columns(criteria: &Criteria, default_order: &str) -> Result<String> {
    if !criteria.has_aggregates() {
        validate_column(default_order)?;
        return Ok(quote_ident(default_order));
    }

    if let Some(group_by) = criteria.group_by.as_ref().filter(|cols| !cols.is_empty()) {
        let columns = group_by
            .iter()
            .map(|column| {
                validate_column(column)?;
                Ok(quote_ident(column))
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(columns.join(", "));
    }

    let column = [&criteria.sum, &criteria.average, &criteria.min, &criteria.max]
        .into_iter()
        .flat_map(|set| set.iter().flatten())
        .next()
        .ok_or_else(|| AdapterError::malformed_criteria("paging requires a sortable column"))?;
    validate_column(column)?;
    Ok(quote_ident(column))
}
