//! Adapter tests over a scripted driver
//!
//! The mock driver records every opened connection, every executed
//! statement, and every close, and answers from a per-test responder. That
//! makes connection lifecycle and statement sequencing observable without a
//! running SQL Server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use mssql_datastore::{
    AdapterError, AttributeDefinition, CollectionDescriptor, ColumnType, CountQuery,
    CreateEachQuery, CreateQuery, Criteria, DatastoreConfig, DestroyQuery, DriverConfig,
    FindQuery, JoinCriteria, JoinInstruction, MssqlAdapter, Result, Row, SortDir, SqlConnection,
    SqlDriver, SqlParam, UpdateQuery, WhereClause,
};

type Responder = dyn Fn(&str, &[SqlParam]) -> Result<Vec<Row>> + Send + Sync;

struct MockState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    log: Mutex<Vec<String>>,
    delay: Option<Duration>,
    responder: Box<Responder>,
}

impl MockState {
    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockDriver {
    state: Arc<MockState>,
}

#[async_trait]
impl SqlDriver for MockDriver {
    async fn open(&self, _config: &DriverConfig) -> Result<Box<dyn SqlConnection>> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<MockState>,
}

#[async_trait]
impl SqlConnection for MockConnection {
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        if let Some(delay) = self.state.delay {
            tokio::time::sleep(delay).await;
        }
        self.state.log.lock().unwrap().push(sql.to_string());
        (self.state.responder)(sql, params)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn mock_adapter(
    responder: impl Fn(&str, &[SqlParam]) -> Result<Vec<Row>> + Send + Sync + 'static,
) -> (MssqlAdapter, Arc<MockState>) {
    mock_adapter_with_delay(None, responder)
}

/// Mock adapter whose statements take `delay` to execute, for tests that
/// need an operation to still be in flight when something else happens
fn mock_adapter_with_delay(
    delay: Option<Duration>,
    responder: impl Fn(&str, &[SqlParam]) -> Result<Vec<Row>> + Send + Sync + 'static,
) -> (MssqlAdapter, Arc<MockState>) {
    let state = Arc::new(MockState {
        opened: AtomicUsize::new(0),
        closed: AtomicUsize::new(0),
        log: Mutex::new(Vec::new()),
        delay,
        responder: Box::new(responder),
    });
    let adapter = MssqlAdapter::with_driver(Arc::new(MockDriver {
        state: state.clone(),
    }));
    (adapter, state)
}

fn row(value: Value) -> Row {
    value.as_object().unwrap().clone()
}

fn collections() -> HashMap<String, CollectionDescriptor> {
    let orders = CollectionDescriptor::new("id")
        .attribute(
            "id",
            AttributeDefinition::new(ColumnType::Integer)
                .auto_increment()
                .not_null(),
        )
        .attribute("status", AttributeDefinition::new(ColumnType::String))
        .attribute("total", AttributeDefinition::new(ColumnType::Float));
    let items = CollectionDescriptor::new("id")
        .attribute(
            "id",
            AttributeDefinition::new(ColumnType::Integer)
                .auto_increment()
                .not_null(),
        )
        .attribute("orderId", AttributeDefinition::new(ColumnType::Integer))
        .attribute("sku", AttributeDefinition::new(ColumnType::String));
    HashMap::from([("orders".to_string(), orders), ("items".to_string(), items)])
}

async fn register_default(adapter: &MssqlAdapter, persistent: bool) {
    let config = DatastoreConfig::builder("default")
        .persistent(persistent)
        .build();
    adapter
        .register_datastore(config, collections())
        .await
        .expect("registration should succeed");
}

// ==================== Registration Tests ====================

#[tokio::test]
async fn test_missing_identity_rejected() {
    let (adapter, _) = mock_adapter(|_, _| Ok(Vec::new()));
    let config = DatastoreConfig::builder("").build();
    let err = adapter
        .register_datastore(config, collections())
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::MissingIdentity));
}

#[tokio::test]
async fn test_duplicate_identity_rejected() {
    let (adapter, _) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;
    let err = adapter
        .register_datastore(DatastoreConfig::builder("default").build(), collections())
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::DuplicateIdentity(identity) if identity == "default"));
}

#[tokio::test]
async fn test_unknown_datastore_and_collection() {
    let (adapter, _) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    let err = adapter
        .find("nope", FindQuery::new("orders", Criteria::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::UnknownDatastore(_)));

    let err = adapter
        .find("default", FindQuery::new("ghosts", Criteria::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::UnknownCollection { .. }));
}

#[tokio::test]
async fn test_registration_is_lazy() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, true).await;
    assert_eq!(state.opened(), 0);
}

#[tokio::test]
async fn test_primary_key_lookup() {
    let (adapter, _) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;
    assert_eq!(adapter.primary_key("default", "orders").unwrap(), "id");
    assert!(adapter.primary_key("default", "ghosts").is_err());
}

// ==================== Connection Lifecycle Tests ====================

#[tokio::test]
async fn test_nonpersistent_opens_and_closes_per_operation() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    for _ in 0..3 {
        adapter
            .find("default", FindQuery::new("orders", Criteria::new()))
            .await
            .unwrap();
    }

    assert_eq!(state.opened(), 3);
    assert_eq!(state.closed(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_nonpersistent_operations_are_isolated() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;
    let adapter = Arc::new(adapter);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let adapter = adapter.clone();
        handles.push(tokio::spawn(async move {
            adapter
                .find("default", FindQuery::new("orders", Criteria::new()))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(state.opened(), 8);
    assert_eq!(state.closed(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_persistent_first_operations_connect_once() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, true).await;
    let adapter = Arc::new(adapter);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let adapter = adapter.clone();
        handles.push(tokio::spawn(async move {
            adapter
                .find("default", FindQuery::new("orders", Criteria::new()))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // All first callers share the one lazily opened connection.
    assert_eq!(state.opened(), 1);
    assert_eq!(state.closed(), 0);
}

#[tokio::test]
async fn test_persistent_opens_once_and_closes_at_teardown() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, true).await;

    for _ in 0..3 {
        adapter
            .find("default", FindQuery::new("orders", Criteria::new()))
            .await
            .unwrap();
    }
    assert_eq!(state.opened(), 1);
    assert_eq!(state.closed(), 0);

    adapter.teardown(None).await;
    assert_eq!(state.closed(), 1);
}

#[tokio::test]
async fn test_failed_statement_still_closes_ephemeral_connection() {
    let (adapter, state) = mock_adapter(|_, _| Err(AdapterError::query("boom")));
    register_default(&adapter, false).await;

    let err = adapter
        .find("default", FindQuery::new("orders", Criteria::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Query(_)));
    assert_eq!(state.opened(), 1);
    assert_eq!(state.closed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_teardown_waits_for_in_flight_persistent_operation() {
    let (adapter, state) =
        mock_adapter_with_delay(Some(Duration::from_millis(50)), |_, _| Ok(Vec::new()));
    register_default(&adapter, true).await;
    let adapter = Arc::new(adapter);

    let in_flight = tokio::spawn({
        let adapter = adapter.clone();
        async move {
            adapter
                .find("default", FindQuery::new("orders", Criteria::new()))
                .await
        }
    });
    // Let the find check the connection out before tearing down.
    tokio::time::sleep(Duration::from_millis(10)).await;
    adapter.teardown(None).await;

    in_flight.await.unwrap().unwrap();
    assert_eq!(state.opened(), 1);
    assert_eq!(state.closed(), 1);
}

#[tokio::test]
async fn test_teardown_single_datastore() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, true).await;
    adapter
        .find("default", FindQuery::new("orders", Criteria::new()))
        .await
        .unwrap();

    adapter.teardown(Some("default")).await;
    assert_eq!(state.closed(), 1);

    let err = adapter
        .find("default", FindQuery::new("orders", Criteria::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::UnknownDatastore(_)));
}

// ==================== Create Tests ====================

#[tokio::test]
async fn test_create_merges_generated_values() {
    let (adapter, state) = mock_adapter(|sql, _| {
        if sql.starts_with("INSERT INTO") {
            Ok(vec![row(json!({"id": 42, "status": "open", "total": 9.5}))])
        } else {
            Ok(Vec::new())
        }
    });
    register_default(&adapter, false).await;

    let created = adapter
        .create(
            "default",
            CreateQuery::new("orders", row(json!({"status": "open", "total": 9.5})))
                .with_fetch(),
        )
        .await
        .unwrap()
        .expect("fetch should return the record");

    assert_eq!(created["id"], json!(42));
    assert_eq!(created["status"], json!("open"));
    assert!(state.log()[0].contains("OUTPUT INSERTED.*"));
}

#[tokio::test]
async fn test_create_without_fetch_returns_nothing() {
    let (adapter, _) = mock_adapter(|_, _| Ok(vec![row(json!({"id": 1}))]));
    register_default(&adapter, false).await;

    let created = adapter
        .create(
            "default",
            CreateQuery::new("orders", row(json!({"status": "open"}))),
        )
        .await
        .unwrap();
    assert!(created.is_none());
}

#[tokio::test]
async fn test_create_with_explicit_identity_pk_brackets_identity_insert() {
    let (adapter, state) = mock_adapter(|_, _| Ok(vec![row(json!({"id": 7, "status": "x"}))]));
    register_default(&adapter, false).await;

    adapter
        .create(
            "default",
            CreateQuery::new("orders", row(json!({"id": 7, "status": "x"}))),
        )
        .await
        .unwrap();

    let sql = &state.log()[0];
    assert!(sql.starts_with("SET IDENTITY_INSERT [dbo].[orders] ON;"));
    assert!(sql.ends_with("SET IDENTITY_INSERT [dbo].[orders] OFF"));
}

#[tokio::test]
async fn test_create_strips_null_primary_key() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    adapter
        .create(
            "default",
            CreateQuery::new("orders", row(json!({"id": null, "status": "open"}))),
        )
        .await
        .unwrap();

    let sql = &state.log()[0];
    assert!(!sql.contains("[id]"));
    assert!(!sql.contains("IDENTITY_INSERT"));
}

#[tokio::test]
async fn test_create_each_batches_in_one_round_trip() {
    let (adapter, state) = mock_adapter(|sql, _| {
        if sql.starts_with("INSERT INTO") {
            Ok(vec![
                row(json!({"id": 1, "status": "a"})),
                row(json!({"id": 2, "status": "b"})),
            ])
        } else {
            Ok(Vec::new())
        }
    });
    register_default(&adapter, false).await;

    let written = adapter
        .create_each(
            "default",
            CreateEachQuery::new(
                "orders",
                vec![row(json!({"status": "a"})), row(json!({"status": "b"}))],
            )
            .with_fetch(),
        )
        .await
        .unwrap()
        .expect("fetch should return the records");

    let log = state.log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].matches("INSERT INTO").count(), 2);
    assert_eq!(written.len(), 2);
    assert_eq!(written[0]["id"], json!(1));
    assert_eq!(written[1]["id"], json!(2));
}

#[tokio::test]
async fn test_create_each_empty_batch_is_a_no_op() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    let written = adapter
        .create_each(
            "default",
            CreateEachQuery::new("orders", Vec::new()).with_fetch(),
        )
        .await
        .unwrap();
    assert_eq!(written, Some(Vec::new()));
    assert_eq!(state.opened(), 0);
}

// ==================== Update Tests ====================

#[tokio::test]
async fn test_update_zero_matches_skips_update_statement() {
    let (adapter, state) = mock_adapter(|sql, _| {
        assert!(sql.starts_with("SELECT [id]"), "only the key probe should run");
        Ok(Vec::new())
    });
    register_default(&adapter, false).await;

    let updated = adapter
        .update(
            "default",
            UpdateQuery::new(
                "orders",
                Criteria::new().where_clause(WhereClause::eq("status", json!("missing"))),
                row(json!({"status": "closed"})),
            )
            .with_fetch(),
        )
        .await
        .unwrap();

    assert!(updated.is_empty());
    let log = state.log();
    assert_eq!(log.len(), 1);
    assert!(!log.iter().any(|sql| sql.starts_with("UPDATE")));
}

#[tokio::test]
async fn test_update_runs_two_phases_on_one_connection() {
    let (adapter, state) = mock_adapter(|sql, _| {
        if sql.starts_with("SELECT [id]") {
            Ok(vec![row(json!({"id": 1})), row(json!({"id": 2}))])
        } else if sql.starts_with("UPDATE") {
            Ok(Vec::new())
        } else {
            Ok(vec![
                row(json!({"id": 1, "status": "closed"})),
                row(json!({"id": 2, "status": "closed"})),
            ])
        }
    });
    register_default(&adapter, false).await;

    let updated = adapter
        .update(
            "default",
            UpdateQuery::new(
                "orders",
                Criteria::new().where_clause(WhereClause::eq("status", json!("open"))),
                row(json!({"status": "closed"})),
            )
            .with_fetch(),
        )
        .await
        .unwrap();

    assert_eq!(updated.len(), 2);

    let log = state.log();
    assert_eq!(log.len(), 3);
    assert!(log[0].starts_with("SELECT [id]"));
    assert!(log[1].starts_with("UPDATE [dbo].[orders]"));
    assert!(log[1].contains("[id] IN"), "update restricted to resolved keys");
    assert!(log[2].starts_with("SELECT *"));

    // All three statements shared one ephemeral connection.
    assert_eq!(state.opened(), 1);
    assert_eq!(state.closed(), 1);
}

#[tokio::test]
async fn test_update_never_reassigns_primary_key() {
    let (adapter, state) = mock_adapter(|sql, _| {
        if sql.starts_with("SELECT [id]") {
            Ok(vec![row(json!({"id": 1}))])
        } else {
            Ok(Vec::new())
        }
    });
    register_default(&adapter, false).await;

    adapter
        .update(
            "default",
            UpdateQuery::new(
                "orders",
                Criteria::new(),
                row(json!({"id": 999, "status": "closed"})),
            ),
        )
        .await
        .unwrap();

    let update_sql = state
        .log()
        .into_iter()
        .find(|sql| sql.starts_with("UPDATE"))
        .expect("update should run");
    assert!(!update_sql.contains("SET [id]"));
    assert!(update_sql.contains("SET [status]"));
}

// ==================== Destroy Tests ====================

#[tokio::test]
async fn test_destroy_with_fetch_reads_before_deleting() {
    let (adapter, state) = mock_adapter(|sql, _| {
        if sql.starts_with("SELECT") {
            Ok(vec![row(json!({"id": 3, "status": "stale"}))])
        } else {
            Ok(Vec::new())
        }
    });
    register_default(&adapter, false).await;

    let destroyed = adapter
        .destroy(
            "default",
            DestroyQuery::new(
                "orders",
                Criteria::new().where_clause(WhereClause::eq("status", json!("stale"))),
            )
            .with_fetch(),
        )
        .await
        .unwrap()
        .expect("fetch should return the destroyed records");

    assert_eq!(destroyed.len(), 1);
    assert_eq!(destroyed[0]["id"], json!(3));

    let log = state.log();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("SELECT"));
    assert!(log[1].starts_with("DELETE"));
}

#[tokio::test]
async fn test_destroy_without_fetch_deletes_only() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    let destroyed = adapter
        .destroy("default", DestroyQuery::new("orders", Criteria::new()))
        .await
        .unwrap();

    assert!(destroyed.is_none());
    let log = state.log();
    assert_eq!(log.len(), 1);
    assert!(log[0].starts_with("DELETE"));
}

// ==================== Find / Count Tests ====================

#[tokio::test]
async fn test_find_casts_rows_per_descriptor() {
    let (adapter, _) = mock_adapter(|_, _| {
        Ok(vec![row(json!({"id": "12", "status": "open", "extra": 1}))])
    });
    register_default(&adapter, false).await;

    let records = adapter
        .find("default", FindQuery::new("orders", Criteria::new()))
        .await
        .unwrap();

    assert_eq!(records[0]["id"], json!(12));
    assert_eq!(records[0]["extra"], json!(1));
}

#[tokio::test]
async fn test_find_group_by_without_aggregate_is_rejected_before_connecting() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    let err = adapter
        .find(
            "default",
            FindQuery::new(
                "orders",
                Criteria::new().group_by(vec!["status".to_string()]),
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::MalformedCriteria(_)));
    assert_eq!(state.opened(), 0);
}

#[tokio::test]
async fn test_find_group_by_with_aggregate_succeeds() {
    let (adapter, state) = mock_adapter(|_, _| {
        Ok(vec![row(json!({"status": "open", "total": 42.5}))])
    });
    register_default(&adapter, false).await;

    let records = adapter
        .find(
            "default",
            FindQuery::new(
                "orders",
                Criteria::new()
                    .group_by(vec!["status".to_string()])
                    .sum(vec!["total".to_string()]),
            ),
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert!(state.log()[0].contains("SUM([total])"));
}

#[tokio::test]
async fn test_find_paging_without_sort_orders_by_primary_key() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    adapter
        .find(
            "default",
            FindQuery::new("orders", Criteria::new().skip(10).limit(5)),
        )
        .await
        .unwrap();

    assert!(
        state.log()[0]
            .contains("ORDER BY [id] OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY")
    );
}

#[tokio::test]
async fn test_count() {
    let (adapter, state) = mock_adapter(|_, _| Ok(vec![row(json!({"count": 7}))]));
    register_default(&adapter, false).await;

    let count = adapter
        .count(
            "default",
            CountQuery::new(
                "orders",
                Criteria::new().where_clause(WhereClause::gt("total", json!(10))),
            ),
        )
        .await
        .unwrap();

    assert_eq!(count, 7);
    assert!(state.log()[0].starts_with("SELECT COUNT(*)"));
}

// ==================== Join Tests ====================

#[tokio::test]
async fn test_join_populates_child_collections() {
    let (adapter, state) = mock_adapter(|sql, _| {
        if sql.contains("[dbo].[orders]") {
            Ok(vec![row(json!({"id": 1})), row(json!({"id": 2}))])
        } else {
            Ok(vec![
                row(json!({"id": 10, "orderId": 1, "sku": "a"})),
                row(json!({"id": 11, "orderId": 1, "sku": "b"})),
            ])
        }
    });
    register_default(&adapter, false).await;

    let parents = adapter
        .join(
            "default",
            JoinCriteria::new("orders", Criteria::new()).instruction(
                JoinInstruction::new("items", "id", "orderId", "items").as_collection(),
            ),
        )
        .await
        .unwrap();

    assert_eq!(parents[0]["items"].as_array().unwrap().len(), 2);
    assert_eq!(parents[1]["items"], json!([]));

    let child_sql = &state.log()[1];
    assert!(child_sql.contains("[orderId] IN"));
}

#[tokio::test]
async fn test_join_with_no_parents_skips_child_queries() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    let parents = adapter
        .join(
            "default",
            JoinCriteria::new("orders", Criteria::new()).instruction(
                JoinInstruction::new("items", "id", "orderId", "items").as_collection(),
            ),
        )
        .await
        .unwrap();

    assert!(parents.is_empty());
    assert_eq!(state.log().len(), 1);
}

// ==================== Schema Operation Tests ====================

#[tokio::test]
async fn test_describe_missing_table_returns_none() {
    let (adapter, _) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    let described = adapter.describe("default", "orders").await.unwrap();
    assert!(described.is_none());
}

#[tokio::test]
async fn test_describe_normalizes_catalog_rows() {
    let (adapter, state) = mock_adapter(|_, _| {
        Ok(vec![row(json!({
            "ColumnName": "id",
            "TypeName": "bigint",
            "Nullable": false,
            "AutoIncrement": true,
            "Unique": 1,
            "PrimaryKey": 1,
            "Indexed": 1
        }))])
    });
    register_default(&adapter, false).await;

    let described = adapter
        .describe("default", "orders")
        .await
        .unwrap()
        .expect("table should exist");

    assert!(described["id"].primary_key);
    assert!(described["id"].auto_increment);

    // Describe works for tables that are not registered collections.
    adapter.describe("default", "unregistered").await.unwrap();
    assert!(state.log()[1].contains("sys.tables"));
}

#[tokio::test]
async fn test_define_emits_create_table() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    let definition = HashMap::from([
        (
            "id".to_string(),
            AttributeDefinition::new(ColumnType::Integer)
                .auto_increment()
                .not_null(),
        ),
        ("status".to_string(), AttributeDefinition::new(ColumnType::String)),
    ]);
    adapter.define("default", "orders", &definition).await.unwrap();

    let sql = &state.log()[0];
    assert!(sql.starts_with("CREATE TABLE [dbo].[orders]"));
    assert!(sql.contains("[id] BIGINT IDENTITY(1,1) NOT NULL PRIMARY KEY"));
}

#[tokio::test]
async fn test_drop_is_guarded_against_missing_table() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    adapter.drop("default", "orders").await.unwrap();
    assert_eq!(
        state.log()[0],
        "IF OBJECT_ID('[dbo].[orders]', 'U') IS NOT NULL DROP TABLE [dbo].[orders]"
    );
}

// ==================== Raw Query Tests ====================

#[tokio::test]
async fn test_raw_query_passes_through_uncast() {
    let (adapter, state) = mock_adapter(|_, _| Ok(vec![row(json!({"n": "7"}))]));
    register_default(&adapter, false).await;

    let rows = adapter
        .raw_query(
            "default",
            "SELECT COUNT(*) AS [n] FROM [dbo].[orders] WHERE [total] > @P1",
            &[SqlParam::Int(10)],
        )
        .await
        .unwrap();

    // Raw results are not cast against any descriptor.
    assert_eq!(rows[0]["n"], json!("7"));
    assert_eq!(state.opened(), 1);
    assert_eq!(state.closed(), 1);
}

// ==================== Criteria Shape Tests ====================

#[tokio::test]
async fn test_find_with_full_criteria_shape() {
    let (adapter, state) = mock_adapter(|_, _| Ok(Vec::new()));
    register_default(&adapter, false).await;

    adapter
        .find(
            "default",
            FindQuery::new(
                "orders",
                Criteria::new()
                    .select(vec!["id".to_string(), "status".to_string()])
                    .where_clause(WhereClause::and(vec![
                        WhereClause::ne("status", Value::Null),
                        WhereClause::contains("status", "op"),
                    ]))
                    .sort("total", SortDir::Desc)
                    .limit(3),
            ),
        )
        .await
        .unwrap();

    let sql = &state.log()[0];
    assert!(sql.starts_with("SELECT [id], [status] FROM [dbo].[orders]"));
    assert!(sql.contains("[status] IS NOT NULL"));
    assert!(sql.contains("[status] LIKE @P1"));
    assert!(sql.contains("ORDER BY [total] DESC OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY"));
}
