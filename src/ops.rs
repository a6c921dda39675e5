//! Operation payloads
//!
//! The per-operation request shapes accepted by `MssqlAdapter`, plus the
//! `Meta` switches that modulate an operation without changing its meaning.

use serde::{Deserialize, Serialize};

use crate::criteria::Criteria;
use crate::record::Record;

/// Cross-cutting operation switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    /// Return the affected records instead of a bare acknowledgement
    pub fetch: bool,
}

impl Meta {
    /// Meta with `fetch` enabled
    pub fn fetch() -> Self {
        Self { fetch: true }
    }
}

/// Insert one record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuery {
    /// Collection to insert into
    pub using: String,
    /// The record to write
    pub new_record: Record,
    #[serde(default)]
    pub meta: Meta,
}

impl CreateQuery {
    pub fn new(using: impl Into<String>, new_record: Record) -> Self {
        Self {
            using: using.into(),
            new_record,
            meta: Meta::default(),
        }
    }

    pub fn with_fetch(mut self) -> Self {
        self.meta.fetch = true;
        self
    }
}

/// Insert a batch of records in one round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEachQuery {
    pub using: String,
    pub new_records: Vec<Record>,
    #[serde(default)]
    pub meta: Meta,
}

impl CreateEachQuery {
    pub fn new(using: impl Into<String>, new_records: Vec<Record>) -> Self {
        Self {
            using: using.into(),
            new_records,
            meta: Meta::default(),
        }
    }

    pub fn with_fetch(mut self) -> Self {
        self.meta.fetch = true;
        self
    }
}

/// Select records under criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindQuery {
    pub using: String,
    #[serde(default)]
    pub criteria: Criteria,
}

impl FindQuery {
    pub fn new(using: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            using: using.into(),
            criteria,
        }
    }
}

/// Update records matched by criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuery {
    pub using: String,
    #[serde(default)]
    pub criteria: Criteria,
    /// Column values to assign on every matched row
    pub values_to_set: Record,
    #[serde(default)]
    pub meta: Meta,
}

impl UpdateQuery {
    pub fn new(using: impl Into<String>, criteria: Criteria, values_to_set: Record) -> Self {
        Self {
            using: using.into(),
            criteria,
            values_to_set,
            meta: Meta::default(),
        }
    }

    pub fn with_fetch(mut self) -> Self {
        self.meta.fetch = true;
        self
    }
}

/// Delete records matched by criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestroyQuery {
    pub using: String,
    #[serde(default)]
    pub criteria: Criteria,
    #[serde(default)]
    pub meta: Meta,
}

impl DestroyQuery {
    pub fn new(using: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            using: using.into(),
            criteria,
            meta: Meta::default(),
        }
    }

    pub fn with_fetch(mut self) -> Self {
        self.meta.fetch = true;
        self
    }
}

/// Count records matched by criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountQuery {
    pub using: String,
    #[serde(default)]
    pub criteria: Criteria,
}

impl CountQuery {
    pub fn new(using: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            using: using.into(),
            criteria,
        }
    }
}
