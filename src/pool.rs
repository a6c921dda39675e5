//! Connection handles
//!
//! Two acquisition modes per datastore. Persistent datastores share one
//! lazily opened connection for their whole lifetime. Non-persistent
//! datastores open a fresh, uniquely tokened connection per operation,
//! bounded by a semaphore sized to the pool maximum, and close it when the
//! operation releases the handle.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::driver::{DriverConfig, Row, SqlConnection, SqlDriver};
use crate::error::{AdapterError, Result};
use crate::sql::value::SqlParam;

type SharedConnection = Arc<Mutex<Box<dyn SqlConnection>>>;

/// A connection checked out for one operation
pub(crate) enum Handle {
    Persistent(SharedConnection),
    Ephemeral(EphemeralLease),
}

/// A fresh connection owned by a single operation
pub(crate) struct EphemeralLease {
    token: Uuid,
    conn: Box<dyn SqlConnection>,
    _permit: OwnedSemaphorePermit,
}

impl Handle {
    pub(crate) async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        debug!(sql, params = params.len(), "executing statement");
        match self {
            Handle::Persistent(shared) => shared.lock().await.execute(sql, params).await,
            Handle::Ephemeral(lease) => lease.conn.execute(sql, params).await,
        }
    }

    /// Hand the connection back
    ///
    /// Ephemeral connections are closed here, on success and failure paths
    /// alike; a close failure is logged, not surfaced, since the operation's
    /// own outcome is already decided.
    pub(crate) async fn release(self) {
        match self {
            Handle::Persistent(_) => {}
            Handle::Ephemeral(lease) => {
                let EphemeralLease {
                    token,
                    conn,
                    _permit,
                } = lease;
                if let Err(err) = conn.close().await {
                    warn!(%token, error = %err, "failed to close ephemeral connection");
                } else {
                    debug!(%token, "closed ephemeral connection");
                }
            }
        }
    }
}

/// Per-datastore connection state
pub(crate) struct ConnectionState {
    persistent: bool,
    driver_config: DriverConfig,
    shared: Mutex<Option<SharedConnection>>,
    limiter: Arc<Semaphore>,
}

impl ConnectionState {
    pub(crate) fn new(persistent: bool, driver_config: DriverConfig, max_connections: u32) -> Self {
        Self {
            persistent,
            driver_config,
            shared: Mutex::new(None),
            limiter: Arc::new(Semaphore::new(max_connections.max(1) as usize)),
        }
    }

    /// Check out a connection for one operation
    pub(crate) async fn acquire(&self, driver: &dyn SqlDriver) -> Result<Handle> {
        if self.persistent {
            // Holding the outer lock while connecting means concurrent first
            // operations wait for one connection instead of racing to open
            // their own.
            let mut slot = self.shared.lock().await;
            if let Some(shared) = slot.as_ref() {
                return Ok(Handle::Persistent(shared.clone()));
            }
            let conn = driver.open(&self.driver_config).await?;
            let shared: SharedConnection = Arc::new(Mutex::new(conn));
            *slot = Some(shared.clone());
            debug!("opened persistent connection");
            Ok(Handle::Persistent(shared))
        } else {
            let permit = self
                .limiter
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| AdapterError::connect("connection limiter closed"))?;
            let conn = driver.open(&self.driver_config).await?;
            let token = Uuid::new_v4();
            debug!(%token, "opened ephemeral connection");
            Ok(Handle::Ephemeral(EphemeralLease {
                token,
                conn,
                _permit: permit,
            }))
        }
    }

    /// Close the persistent connection if one was ever opened
    ///
    /// Taking the slot first means no new operation can check the connection
    /// out; in-flight operations still hold clones, so the close waits for
    /// them to finish rather than being skipped.
    pub(crate) async fn shutdown(&self) {
        let Some(mut shared) = self.shared.lock().await.take() else {
            return;
        };
        loop {
            match Arc::try_unwrap(shared) {
                Ok(mutex) => {
                    if let Err(err) = mutex.into_inner().close().await {
                        warn!(error = %err, "failed to close persistent connection");
                    } else {
                        debug!("closed persistent connection");
                    }
                    return;
                }
                Err(still_shared) => {
                    shared = still_shared;
                    // Locking waits out the in-flight statement; the yield
                    // lets that operation drop its handle before the retry.
                    drop(shared.lock().await);
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}
