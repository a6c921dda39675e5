//! The adapter
//!
//! `MssqlAdapter` owns the datastore registry and drives every operation:
//! acquire a connection handle, run the operation's statements on it in
//! order, release the handle, shape the result. Handles are always released,
//! on error paths included, before the operation returns.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::collection::{AttributeDefinition, CollectionDescriptor};
use crate::config::DatastoreConfig;
use crate::criteria::{Criteria, WhereClause};
use crate::driver::{Row, SqlDriver, TiberiusDriver};
use crate::error::{AdapterError, Result};
use crate::join::{self, JoinCriteria};
use crate::ops::{CountQuery, CreateEachQuery, CreateQuery, DestroyQuery, FindQuery, UpdateQuery};
use crate::record::{Record, cast_record, merge_generated};
use crate::registry::{DatastoreEntry, Registry};
use crate::schema::{ColumnInfo, normalize_columns};
use crate::sql::statement;
use crate::sql::value::{Coercion, SqlParam, prepare_value};

/// SQL Server adapter instance
///
/// All lifecycle state lives on the instance; two adapters never share
/// connections or registrations.
pub struct MssqlAdapter {
    driver: Arc<dyn SqlDriver>,
    registry: Registry,
}

impl Default for MssqlAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MssqlAdapter {
    /// Adapter backed by the tiberius driver
    pub fn new() -> Self {
        Self::with_driver(Arc::new(TiberiusDriver))
    }

    /// Adapter backed by a custom driver (tests script one)
    pub fn with_driver(driver: Arc<dyn SqlDriver>) -> Self {
        Self {
            driver,
            registry: Registry::new(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Register a datastore and its collections under a unique identity
    ///
    /// No connection is opened here; the first operation pays that cost.
    pub async fn register_datastore(
        &self,
        config: DatastoreConfig,
        collections: HashMap<String, CollectionDescriptor>,
    ) -> Result<()> {
        if config.identity.is_empty() {
            return Err(AdapterError::MissingIdentity);
        }
        let identity = config.identity.clone();
        self.registry
            .insert(Arc::new(DatastoreEntry::new(&config, collections)))?;
        // Registration completes off the caller's current poll, so work
        // scheduled right after registering observes a consistent registry.
        tokio::task::yield_now().await;
        info!(%identity, "registered datastore");
        Ok(())
    }

    /// Tear down one datastore, or every datastore when `identity` is `None`
    ///
    /// Closes the persistent connection if one was opened. Unknown
    /// identities are a no-op.
    pub async fn teardown(&self, identity: Option<&str>) {
        match identity {
            Some(identity) => {
                if let Some(entry) = self.registry.remove(identity) {
                    entry.connections.shutdown().await;
                    info!(%identity, "tore down datastore");
                }
            }
            None => {
                for entry in self.registry.drain() {
                    entry.connections.shutdown().await;
                    info!(identity = %entry.identity, "tore down datastore");
                }
            }
        }
    }

    /// Physical primary-key column of a registered collection
    pub fn primary_key(&self, identity: &str, collection: &str) -> Result<String> {
        let entry = self.registry.get(identity)?;
        Ok(entry.collection(collection)?.primary_key_column().to_string())
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Insert one record
    ///
    /// Returns the written record (generated values merged over the
    /// submitted ones, cast per the descriptor) when `meta.fetch` is set.
    pub async fn create(&self, identity: &str, query: CreateQuery) -> Result<Option<Record>> {
        let entry = self.registry.get(identity)?;
        let descriptor = entry.collection(&query.using)?;
        let table = entry.table_ref(&query.using);
        let pk_column = descriptor.primary_key_column().to_string();

        let record = strip_null_pk(query.new_record, &pk_column);
        let columns = prepare_columns(descriptor, &record);
        let identity_insert =
            descriptor.primary_key_is_identity() && record.contains_key(&pk_column);
        let statement = statement::insert(&table, &columns, identity_insert);

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(&statement.sql, &statement.params).await;
        handle.release().await;
        let rows = outcome?;

        if !query.meta.fetch {
            return Ok(None);
        }
        let merged = merge_generated(&record, rows.first(), &pk_column);
        Ok(Some(cast_record(descriptor, merged)))
    }

    /// Insert a batch of records in one round trip
    ///
    /// The batch travels as one multi-statement string; each record's
    /// written row comes back through its own OUTPUT clause.
    pub async fn create_each(
        &self,
        identity: &str,
        query: CreateEachQuery,
    ) -> Result<Option<Vec<Record>>> {
        let entry = self.registry.get(identity)?;
        let descriptor = entry.collection(&query.using)?;
        let table = entry.table_ref(&query.using);
        let pk_column = descriptor.primary_key_column().to_string();

        if query.new_records.is_empty() {
            return Ok(query.meta.fetch.then(Vec::new));
        }

        let records: Vec<Record> = query
            .new_records
            .into_iter()
            .map(|record| strip_null_pk(record, &pk_column))
            .collect();
        let identity_insert = descriptor.primary_key_is_identity()
            && records.iter().any(|record| record.contains_key(&pk_column));
        let prepared: Vec<Vec<(String, SqlParam)>> = records
            .iter()
            .map(|record| prepare_columns(descriptor, record))
            .collect();
        let statement = statement::insert_each(&table, &prepared, identity_insert);

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(&statement.sql, &statement.params).await;
        handle.release().await;
        let rows = outcome?;

        if !query.meta.fetch {
            return Ok(None);
        }
        let written = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let merged = merge_generated(record, rows.get(index), &pk_column);
                cast_record(descriptor, merged)
            })
            .collect();
        Ok(Some(written))
    }

    /// Update records matched by criteria
    ///
    /// Runs in two phases on one handle: resolve the primary keys the
    /// criteria matches, then update under the original criteria restricted
    /// to those keys. Zero matches yield an empty result without running
    /// the UPDATE at all.
    pub async fn update(&self, identity: &str, query: UpdateQuery) -> Result<Vec<Record>> {
        let entry = self.registry.get(identity)?;
        let descriptor = entry.collection(&query.using)?;
        let table = entry.table_ref(&query.using);
        let pk_column = descriptor.primary_key_column().to_string();

        let keys_statement =
            statement::select_keys(&table, &pk_column, query.criteria.where_clause.as_ref())?;

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = async {
            let key_rows = handle
                .execute(&keys_statement.sql, &keys_statement.params)
                .await?;
            if key_rows.is_empty() {
                return Ok(Vec::new());
            }
            let keys: Vec<Value> = key_rows
                .iter()
                .filter_map(|row| row.get(&pk_column))
                .filter(|value| !value.is_null())
                .cloned()
                .collect();

            let values = strip_pk(query.values_to_set, &pk_column);
            let set = prepare_columns(descriptor, &values);
            let restricted = restrict_to_keys(
                query.criteria.where_clause.clone(),
                &pk_column,
                keys.clone(),
            );
            let update_statement = statement::update(&table, &set, &restricted)?;
            handle
                .execute(&update_statement.sql, &update_statement.params)
                .await?;

            if !query.meta.fetch {
                return Ok(Vec::new());
            }
            let refetch = Criteria::new().where_clause(WhereClause::is_in(pk_column.clone(), keys));
            let select_statement = statement::select(&table, &refetch, &pk_column)?;
            let rows = handle
                .execute(&select_statement.sql, &select_statement.params)
                .await?;
            Ok(rows
                .into_iter()
                .map(|row| cast_record(descriptor, row))
                .collect())
        }
        .await;
        handle.release().await;
        outcome
    }

    /// Delete records matched by criteria
    ///
    /// With `meta.fetch`, the doomed records are read on the same handle
    /// before the DELETE runs and returned as they were.
    pub async fn destroy(&self, identity: &str, query: DestroyQuery) -> Result<Option<Vec<Record>>> {
        let entry = self.registry.get(identity)?;
        let descriptor = entry.collection(&query.using)?;
        let table = entry.table_ref(&query.using);
        let pk_column = descriptor.primary_key_column().to_string();

        let delete_statement = statement::delete(&table, query.criteria.where_clause.as_ref())?;

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = async {
            let doomed = if query.meta.fetch {
                let select_statement = statement::select(&table, &query.criteria, &pk_column)?;
                let rows = handle
                    .execute(&select_statement.sql, &select_statement.params)
                    .await?;
                Some(
                    rows.into_iter()
                        .map(|row| cast_record(descriptor, row))
                        .collect(),
                )
            } else {
                None
            };
            handle
                .execute(&delete_statement.sql, &delete_statement.params)
                .await?;
            Ok(doomed)
        }
        .await;
        handle.release().await;
        outcome
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Select records under criteria
    pub async fn find(&self, identity: &str, query: FindQuery) -> Result<Vec<Record>> {
        let entry = self.registry.get(identity)?;
        let descriptor = entry.collection(&query.using)?;
        let table = entry.table_ref(&query.using);
        let pk_column = descriptor.primary_key_column().to_string();

        let statement = statement::select(&table, &query.criteria, &pk_column)?;

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(&statement.sql, &statement.params).await;
        handle.release().await;
        Ok(outcome?
            .into_iter()
            .map(|row| cast_record(descriptor, row))
            .collect())
    }

    /// Count records matched by criteria
    pub async fn count(&self, identity: &str, query: CountQuery) -> Result<u64> {
        let entry = self.registry.get(identity)?;
        entry.collection(&query.using)?;
        let table = entry.table_ref(&query.using);

        let statement = statement::count(&table, query.criteria.where_clause.as_ref())?;

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(&statement.sql, &statement.params).await;
        handle.release().await;

        outcome?
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_u64)
            .ok_or_else(|| AdapterError::query("count returned no usable row"))
    }

    /// Run a parent query and populate child records under each
    /// instruction's alias
    pub async fn join(&self, identity: &str, mut join_criteria: JoinCriteria) -> Result<Vec<Record>> {
        // Projection would strip the keys the instructions need.
        join_criteria.criteria.select = None;
        let mut parents = self
            .find(
                identity,
                FindQuery::new(join_criteria.using.clone(), join_criteria.criteria),
            )
            .await?;

        for instruction in &join_criteria.instructions {
            let keys = join::parent_key_values(&parents, &instruction.parent_key);
            let children = if keys.is_empty() {
                Vec::new()
            } else {
                let membership = WhereClause::is_in(instruction.child_key.clone(), keys);
                let mut criteria = instruction.criteria.clone().unwrap_or_default();
                criteria.where_clause = Some(match criteria.where_clause.take() {
                    Some(extra) => WhereClause::and(vec![membership, extra]),
                    None => membership,
                });
                self.find(identity, FindQuery::new(instruction.child.clone(), criteria))
                    .await?
            };
            join::attach_children(&mut parents, children, instruction);
        }
        Ok(parents)
    }

    // =========================================================================
    // Schema path
    // =========================================================================

    /// Introspect a table's columns
    ///
    /// Returns `None` when the table does not exist.
    pub async fn describe(
        &self,
        identity: &str,
        collection: &str,
    ) -> Result<Option<HashMap<String, ColumnInfo>>> {
        let entry = self.registry.get(identity)?;
        let table = entry.table_ref(collection);

        let statement = statement::describe(&table);

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(&statement.sql, &statement.params).await;
        handle.release().await;
        let rows = outcome?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(normalize_columns(&rows)))
    }

    /// Create a table from attribute definitions
    ///
    /// The primary-key constraint comes from the registered descriptor when
    /// the collection is registered.
    pub async fn define(
        &self,
        identity: &str,
        collection: &str,
        definition: &HashMap<String, AttributeDefinition>,
    ) -> Result<()> {
        let entry = self.registry.get(identity)?;
        let table = entry.table_ref(collection);
        let primary_key = entry
            .collections
            .get(collection)
            .map(|descriptor| descriptor.primary_key.clone());

        let statement = statement::create_table(&table, definition, primary_key.as_deref());

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(&statement.sql, &statement.params).await;
        handle.release().await;
        outcome?;
        Ok(())
    }

    /// Drop a table; a missing table is a no-op
    pub async fn drop(&self, identity: &str, collection: &str) -> Result<()> {
        let entry = self.registry.get(identity)?;
        let table = entry.table_ref(collection);

        let statement = statement::drop_table(&table);

        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(&statement.sql, &statement.params).await;
        handle.release().await;
        outcome?;
        Ok(())
    }

    /// Run a raw statement with bound parameters, returning rows uncast
    pub async fn raw_query(
        &self,
        identity: &str,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Row>> {
        let entry = self.registry.get(identity)?;
        let mut handle = entry.connections.acquire(self.driver.as_ref()).await?;
        let outcome = handle.execute(sql, params).await;
        handle.release().await;
        outcome
    }
}

/// Drop the primary key from a record when its value is null, so an
/// IDENTITY column is left to generate
fn strip_null_pk(mut record: Record, pk_column: &str) -> Record {
    if record.get(pk_column).is_some_and(Value::is_null) {
        record.remove(pk_column);
    }
    record
}

/// Drop the primary key from a record unconditionally (updates never move
/// a row to a new key)
fn strip_pk(mut record: Record, pk_column: &str) -> Record {
    record.remove(pk_column);
    record
}

/// Coerce a record's values against their declared column types
fn prepare_columns(
    descriptor: &CollectionDescriptor,
    record: &Record,
) -> Vec<(String, SqlParam)> {
    record
        .iter()
        .map(|(column, value)| {
            let coerced = prepare_value(value, descriptor.column_type_of(column));
            if coerced.coercion == Coercion::Unknown {
                warn!(
                    column = %column,
                    "value did not match its declared type; binding string form"
                );
            }
            (column.clone(), coerced.param)
        })
        .collect()
}

/// Restrict a where clause to a resolved primary-key set
fn restrict_to_keys(
    original: Option<WhereClause>,
    pk_column: &str,
    keys: Vec<Value>,
) -> WhereClause {
    let membership = WhereClause::is_in(pk_column.to_string(), keys);
    match original {
        Some(original) => WhereClause::and(vec![original, membership]),
        None => membership,
    }
}
