//! Collection descriptors
//!
//! A `CollectionDescriptor` tells the adapter how one logical collection maps
//! onto a physical SQL Server table: which attribute is the primary key, how
//! attributes map to columns and types, and which schema the table lives in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sql::ident::{DEFAULT_SCHEMA, TableRef};

/// Logical column types supported by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Json,
}

impl ColumnType {
    /// Map to the SQL Server column type used in CREATE TABLE
    pub fn to_sql_type(&self) -> &'static str {
        match self {
            ColumnType::String => "NVARCHAR(255)",
            ColumnType::Text => "NVARCHAR(MAX)",
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "FLOAT",
            ColumnType::Boolean => "BIT",
            ColumnType::DateTime => "DATETIMEOFFSET",
            ColumnType::Json => "NVARCHAR(MAX)",
        }
    }
}

/// One attribute of a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Physical column name when it differs from the attribute name
    #[serde(rename = "columnName", skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// Logical column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether NULL is allowed (default true)
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether the database generates the value (IDENTITY)
    #[serde(rename = "autoIncrement", default)]
    pub auto_increment: bool,
    /// Whether a UNIQUE constraint applies
    #[serde(default)]
    pub unique: bool,
}

fn default_nullable() -> bool {
    true
}

impl AttributeDefinition {
    /// Create a nullable attribute of the given type
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_name: None,
            column_type,
            nullable: true,
            auto_increment: false,
            unique: false,
        }
    }

    /// Override the physical column name
    pub fn with_column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    /// Mark NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as database-generated (IDENTITY)
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark UNIQUE
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// How a collection maps onto a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Name of the primary-key attribute
    #[serde(rename = "primaryKey")]
    pub primary_key: String,
    /// Attribute definitions keyed by attribute name
    pub attributes: HashMap<String, AttributeDefinition>,
    /// Schema override; collections default to `dbo`
    #[serde(rename = "schemaName", default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
}

impl CollectionDescriptor {
    /// Create a descriptor with the given primary-key attribute name
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            attributes: HashMap::new(),
            schema_name: None,
        }
    }

    /// Add an attribute
    pub fn attribute(mut self, name: impl Into<String>, definition: AttributeDefinition) -> Self {
        self.attributes.insert(name.into(), definition);
        self
    }

    /// Override the table's schema
    pub fn with_schema(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Schema this collection's table lives in
    pub fn schema(&self) -> &str {
        self.schema_name.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }

    /// Build the table reference for this collection's table
    pub fn table_ref(&self, collection_name: &str) -> TableRef {
        TableRef::new(self.schema(), collection_name)
    }

    /// Physical column name of the primary key
    ///
    /// Resolves a `columnName` override on the primary-key attribute, falling
    /// back to the attribute name itself.
    pub fn primary_key_column(&self) -> &str {
        self.attributes
            .get(&self.primary_key)
            .and_then(|attr| attr.column_name.as_deref())
            .unwrap_or(&self.primary_key)
    }

    /// The attribute definition behind a physical column name, if declared
    pub fn attribute_for_column(&self, column: &str) -> Option<&AttributeDefinition> {
        self.attributes.values().find(|attr| {
            attr.column_name.as_deref() == Some(column)
        }).or_else(|| {
            self.attributes
                .iter()
                .find(|(name, attr)| attr.column_name.is_none() && name.as_str() == column)
                .map(|(_, attr)| attr)
        })
    }

    /// Declared type of a physical column, if any
    pub fn column_type_of(&self, column: &str) -> Option<ColumnType> {
        self.attribute_for_column(column).map(|attr| attr.column_type)
    }

    /// Whether the primary key is database-generated
    pub fn primary_key_is_identity(&self) -> bool {
        self.attributes
            .get(&self.primary_key)
            .map(|attr| attr.auto_increment)
            .unwrap_or(false)
    }
}
