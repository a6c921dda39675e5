//! Query criteria types
//!
//! `Criteria` is the declarative query shape every read-path operation takes:
//! a where tree plus projection, ordering, paging, and aggregate directives.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDir,
}

/// Comparison operators usable in a where tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
}

/// A boolean where tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhereClause {
    And(Vec<WhereClause>),
    Or(Vec<WhereClause>),
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
}

impl WhereClause {
    pub fn and(clauses: Vec<WhereClause>) -> Self {
        WhereClause::And(clauses)
    }

    pub fn or(clauses: Vec<WhereClause>) -> Self {
        WhereClause::Or(clauses)
    }

    pub fn compare(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        WhereClause::Compare {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Lte, value)
    }

    pub fn gt(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: Value) -> Self {
        Self::compare(column, CompareOp::Gte, value)
    }

    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::compare(column, CompareOp::In, Value::Array(values))
    }

    pub fn not_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::compare(column, CompareOp::NotIn, Value::Array(values))
    }

    pub fn contains(column: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Contains, Value::String(fragment.into()))
    }

    pub fn starts_with(column: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::compare(
            column,
            CompareOp::StartsWith,
            Value::String(fragment.into()),
        )
    }

    pub fn ends_with(column: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::EndsWith, Value::String(fragment.into()))
    }
}

/// Declarative query criteria
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Criteria {
    /// Row filter
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,
    /// Projected columns; `None` selects `*`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// ORDER BY keys in priority order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<SortKey>>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Rows to skip before the page starts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// GROUP BY columns; requires at least one aggregate directive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    /// SUM aggregates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<Vec<String>>,
    /// AVG aggregates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<Vec<String>>,
    /// MIN aggregates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<String>>,
    /// MAX aggregates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<String>>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.select = Some(columns);
        self
    }

    pub fn sort(mut self, column: impl Into<String>, direction: SortDir) -> Self {
        self.sort.get_or_insert_with(Vec::new).push(SortKey {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn group_by(mut self, columns: Vec<String>) -> Self {
        self.group_by = Some(columns);
        self
    }

    pub fn sum(mut self, columns: Vec<String>) -> Self {
        self.sum = Some(columns);
        self
    }

    pub fn average(mut self, columns: Vec<String>) -> Self {
        self.average = Some(columns);
        self
    }

    pub fn min(mut self, columns: Vec<String>) -> Self {
        self.min = Some(columns);
        self
    }

    pub fn max(mut self, columns: Vec<String>) -> Self {
        self.max = Some(columns);
        self
    }

    /// Whether any aggregate directive is present
    pub fn has_aggregates(&self) -> bool {
        [&self.sum, &self.average, &self.min, &self.max]
            .iter()
            .any(|set| set.as_ref().is_some_and(|cols| !cols.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_chains() {
        let criteria = Criteria::new()
            .where_clause(WhereClause::eq("status", json!("open")))
            .sort("createdAt", SortDir::Desc)
            .limit(10)
            .skip(20);

        assert!(criteria.where_clause.is_some());
        assert_eq!(criteria.sort.as_ref().unwrap().len(), 1);
        assert_eq!(criteria.limit, Some(10));
        assert_eq!(criteria.skip, Some(20));
    }

    #[test]
    fn test_has_aggregates() {
        assert!(!Criteria::new().has_aggregates());
        assert!(Criteria::new().sum(vec!["total".to_string()]).has_aggregates());
        assert!(!Criteria::new().sum(vec![]).has_aggregates());
        assert!(Criteria::new().min(vec!["age".to_string()]).has_aggregates());
    }

    #[test]
    fn test_where_helpers() {
        let clause = WhereClause::and(vec![
            WhereClause::eq("status", json!("open")),
            WhereClause::is_in("region", vec![json!("eu"), json!("us")]),
        ]);

        match clause {
            WhereClause::And(children) => {
                assert_eq!(children.len(), 2);
                match &children[1] {
                    WhereClause::Compare { op, value, .. } => {
                        assert_eq!(*op, CompareOp::In);
                        assert_eq!(value.as_array().unwrap().len(), 2);
                    }
                    other => panic!("expected compare, got {:?}", other),
                }
            }
            other => panic!("expected and, got {:?}", other),
        }
    }

    #[test]
    fn test_criteria_wire_shape() {
        let criteria: Criteria = serde_json::from_value(json!({
            "where": { "compare": { "column": "status", "op": "eq", "value": "open" } },
            "limit": 5,
            "groupBy": ["region"],
            "sum": ["total"]
        }))
        .unwrap();

        assert_eq!(criteria.limit, Some(5));
        assert_eq!(criteria.group_by.as_deref(), Some(&["region".to_string()][..]));
        assert!(criteria.has_aggregates());
    }
}
