//! # mssql-datastore
//!
//! A schema-driven SQL Server data-access adapter.
//!
//! This crate maps declarative queries over named collections onto
//! parameterized T-SQL. Collections are described up front (primary key,
//! attribute types, schema placement); the adapter compiles criteria into
//! SQL, manages connection lifecycles per datastore, and casts result rows
//! back to the types the descriptors promise.
//!
//! ## Features
//!
//! - **Named Datastores**: Register any number of datastores, each with its
//!   own configuration, collections, and connection lifecycle
//! - **Declarative Criteria**: Where trees with AND/OR nesting, projection,
//!   sorting, paging, and grouped aggregates
//! - **Full Record Round Trip**: Inserts and updates return the written rows
//!   via `OUTPUT INSERTED.*`, generated values included
//! - **Two Connection Modes**: A shared persistent connection, or fresh
//!   per-operation connections bounded by a pool limit
//! - **SQL Injection Prevention**: Values always travel as parameters;
//!   identifiers are validated and bracket-quoted
//! - **Pluggable Driver**: The tiberius-backed driver is the default; tests
//!   swap in a scripted one
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//!
//! use mssql_datastore::{
//!     AttributeDefinition, CollectionDescriptor, ColumnType, CreateQuery, Criteria,
//!     DatastoreConfig, FindQuery, MssqlAdapter, WhereClause,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = MssqlAdapter::new();
//!
//!     let orders = CollectionDescriptor::new("id")
//!         .attribute(
//!             "id",
//!             AttributeDefinition::new(ColumnType::Integer)
//!                 .auto_increment()
//!                 .not_null(),
//!         )
//!         .attribute("status", AttributeDefinition::new(ColumnType::String))
//!         .attribute("total", AttributeDefinition::new(ColumnType::Float));
//!
//!     let config = DatastoreConfig::builder("default")
//!         .host("localhost")
//!         .database("shop")
//!         .credentials("sa", "password")
//!         .build();
//!     adapter
//!         .register_datastore(config, HashMap::from([("orders".to_string(), orders)]))
//!         .await?;
//!
//!     let record = serde_json::json!({ "status": "open", "total": 9.5 });
//!     let created = adapter
//!         .create(
//!             "default",
//!             CreateQuery::new("orders", record.as_object().unwrap().clone()).with_fetch(),
//!         )
//!         .await?;
//!     println!("created: {:?}", created);
//!
//!     let criteria = Criteria::new().where_clause(WhereClause::eq("status", "open".into()));
//!     let open = adapter
//!         .find("default", FindQuery::new("orders", criteria))
//!         .await?;
//!     println!("{} open orders", open.len());
//!
//!     adapter.teardown(None).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection Modes
//!
//! Each datastore is either persistent or not:
//!
//! - `persistent(true)`: one connection, opened lazily on the first
//!   operation and shared until teardown.
//! - default: every operation opens a fresh connection, tagged with a unique
//!   token, and closes it when the operation finishes. At most `pool.max`
//!   connections are open concurrently.

pub mod adapter;
pub mod collection;
pub mod config;
pub mod criteria;
pub mod driver;
pub mod error;
pub mod join;
pub mod ops;
pub mod record;
pub mod schema;
pub mod sql;

mod pool;
mod registry;

// Re-export main types for convenience
pub use adapter::MssqlAdapter;
pub use collection::{AttributeDefinition, CollectionDescriptor, ColumnType};
pub use config::{DatastoreConfig, DatastoreConfigBuilder, PoolConfig};
pub use criteria::{CompareOp, Criteria, SortDir, SortKey, WhereClause};
pub use driver::{DriverConfig, Row, SqlConnection, SqlDriver, TiberiusDriver};
pub use error::{AdapterError, Result};
pub use join::{JoinCriteria, JoinInstruction};
pub use ops::{CountQuery, CreateEachQuery, CreateQuery, DestroyQuery, FindQuery, Meta, UpdateQuery};
pub use record::{CastOutcome, Record, cast_value};
pub use schema::ColumnInfo;

// Re-export SQL utilities for advanced users
pub use sql::ident::{quote_ident, validate_column};
pub use sql::value::{CoercedValue, Coercion, SqlParam, prepare_value};
