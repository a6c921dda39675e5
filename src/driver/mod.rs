//! Driver abstraction
//!
//! The adapter talks to SQL Server through the `SqlDriver`/`SqlConnection`
//! pair so the wire client stays swappable (tests script a mock driver, the
//! real one wraps tiberius).

pub mod tiberius;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::sql::value::SqlParam;

pub use self::tiberius::TiberiusDriver;

/// One result row as a JSON object keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Connection settings after config marshalling
///
/// When `url` is set it wins over the discrete fields.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub encrypt: bool,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 1433,
            database: None,
            user: None,
            password: None,
            encrypt: false,
            connection_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Opens connections against one server
#[async_trait]
pub trait SqlDriver: Send + Sync + 'static {
    async fn open(&self, config: &DriverConfig) -> Result<Box<dyn SqlConnection>>;
}

/// One live connection
#[async_trait]
pub trait SqlConnection: Send {
    /// Execute a statement with bound parameters
    ///
    /// Multi-statement batches return the rows of every result set,
    /// flattened in statement order.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>>;

    /// Close the connection
    async fn close(self: Box<Self>) -> Result<()>;
}
