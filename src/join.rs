//! Declarative joins
//!
//! SQL Server side joins are not used; instead the adapter runs the parent
//! query, batches the child queries by key membership, and stitches results
//! together in memory under each instruction's alias.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::criteria::Criteria;
use crate::record::Record;

/// One child population step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinInstruction {
    /// Child collection to query
    pub child: String,
    /// Parent column whose values key the join
    pub parent_key: String,
    /// Child column matched against the parent key values
    pub child_key: String,
    /// Field name the results land under on each parent record
    pub alias: String,
    /// Extra criteria applied to the child query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    /// Whether the alias holds a list (one-to-many) or a single record
    #[serde(default)]
    pub collection: bool,
}

impl JoinInstruction {
    pub fn new(
        child: impl Into<String>,
        parent_key: impl Into<String>,
        child_key: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            child: child.into(),
            parent_key: parent_key.into(),
            child_key: child_key.into(),
            alias: alias.into(),
            criteria: None,
            collection: false,
        }
    }

    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Populate a list of children instead of a single record
    pub fn as_collection(mut self) -> Self {
        self.collection = true;
        self
    }
}

/// A parent query plus its population steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinCriteria {
    /// Parent collection
    pub using: String,
    /// Criteria for the parent query
    #[serde(default)]
    pub criteria: Criteria,
    /// Child population steps, applied in order
    pub instructions: Vec<JoinInstruction>,
}

impl JoinCriteria {
    pub fn new(using: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            using: using.into(),
            criteria,
            instructions: Vec::new(),
        }
    }

    pub fn instruction(mut self, instruction: JoinInstruction) -> Self {
        self.instructions.push(instruction);
        self
    }
}

/// Distinct, non-null parent key values in first-seen order
pub(crate) fn parent_key_values(parents: &[Record], parent_key: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    for parent in parents {
        if let Some(value) = parent.get(parent_key) {
            if !value.is_null() && !seen.contains(value) {
                seen.push(value.clone());
            }
        }
    }
    seen
}

/// Attach fetched children to their parents under the instruction's alias
pub(crate) fn attach_children(
    parents: &mut [Record],
    children: Vec<Record>,
    instruction: &JoinInstruction,
) {
    let mut by_key: HashMap<String, Vec<Record>> = HashMap::new();
    for child in children {
        if let Some(key) = child.get(&instruction.child_key) {
            if !key.is_null() {
                by_key.entry(key.to_string()).or_default().push(child);
            }
        }
    }

    for parent in parents {
        let matches = parent
            .get(&instruction.parent_key)
            .filter(|value| !value.is_null())
            .and_then(|value| by_key.get(&value.to_string()))
            .cloned()
            .unwrap_or_default();

        if instruction.collection {
            parent.insert(
                instruction.alias.clone(),
                Value::Array(matches.into_iter().map(Value::Object).collect()),
            );
        } else if let Some(first) = matches.into_iter().next() {
            parent.insert(instruction.alias.clone(), Value::Object(first));
        }
    }
}
