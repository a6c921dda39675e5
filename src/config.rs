//! Datastore configuration
//!
//! Provides a builder pattern for configuring a datastore and the marshalling
//! step that turns user-facing settings into a `DriverConfig`.

use std::time::Duration;

use crate::driver::DriverConfig;

/// Connection pool bounds for non-persistent datastores
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum connections kept warm (advisory)
    pub min: u32,
    /// Maximum concurrently open connections
    pub max: u32,
    /// How long an idle connection may linger
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 5,
            max: 30,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Configuration for one registered datastore
#[derive(Debug, Clone)]
pub struct DatastoreConfig {
    /// Unique name this datastore is registered under
    pub identity: String,
    /// Raw connection URL; takes precedence over the discrete fields
    pub url: Option<String>,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database to use after login
    pub database: Option<String>,
    /// Login user
    pub user: Option<String>,
    /// Login password
    pub password: Option<String>,
    /// Whether to require an encrypted channel
    pub encrypt: bool,
    /// Reuse one long-lived connection instead of opening per operation
    pub persistent: bool,
    /// Time allowed for connection establishment
    pub connection_timeout: Duration,
    /// Time allowed per request
    pub request_timeout: Duration,
    /// Pool bounds for non-persistent mode
    pub pool: PoolConfig,
}

impl DatastoreConfig {
    /// Create a configuration builder for the given identity
    pub fn builder(identity: impl Into<String>) -> DatastoreConfigBuilder {
        DatastoreConfigBuilder::new(identity)
    }

    /// Flatten into the settings the driver needs
    ///
    /// A configured `url` wins over host/port/database/credentials.
    pub fn marshal(&self) -> DriverConfig {
        DriverConfig {
            url: self.url.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            encrypt: self.encrypt,
            connection_timeout: self.connection_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

/// Builder for DatastoreConfig
#[derive(Debug)]
pub struct DatastoreConfigBuilder {
    config: DatastoreConfig,
}

impl DatastoreConfigBuilder {
    /// Create a builder with defaults: localhost:1433, 60 second timeouts,
    /// non-persistent, unencrypted
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            config: DatastoreConfig {
                identity: identity.into(),
                url: None,
                host: "localhost".to_string(),
                port: 1433,
                database: None,
                user: None,
                password: None,
                encrypt: false,
                persistent: false,
                connection_timeout: Duration::from_secs(60),
                request_timeout: Duration::from_secs(60),
                pool: PoolConfig::default(),
            },
        }
    }

    /// Use a raw connection URL (overrides host/port/database/credentials)
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = Some(url.into());
        self
    }

    /// Set the server host (default: localhost)
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port (default: 1433)
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the database to use after login
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    /// Set login credentials
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.user = Some(user.into());
        self.config.password = Some(password.into());
        self
    }

    /// Require an encrypted channel (default: false)
    pub fn encrypt(mut self, enabled: bool) -> Self {
        self.config.encrypt = enabled;
        self
    }

    /// Reuse one long-lived connection across operations (default: false)
    pub fn persistent(mut self, enabled: bool) -> Self {
        self.config.persistent = enabled;
        self
    }

    /// Set the connection establishment timeout (default: 60s)
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Set the per-request timeout (default: 60s)
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Override the pool bounds (default: min 5, max 30, idle 300s)
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.config.pool = pool;
        self
    }

    /// Build the configuration
    pub fn build(self) -> DatastoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Default Tests
    // =========================================================================

    #[test]
    fn test_defaults() {
        let config = DatastoreConfig::builder("default").build();

        assert_eq!(config.identity, "default");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1433);
        assert!(config.url.is_none());
        assert!(config.database.is_none());
        assert!(!config.encrypt);
        assert!(!config.persistent);
        assert_eq!(config.connection_timeout, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.pool.min, 5);
        assert_eq!(config.pool.max, 30);
        assert_eq!(config.pool.idle_timeout, Duration::from_secs(300));
    }

    // =========================================================================
    // Builder Tests
    // =========================================================================

    #[test]
    fn test_full_custom_config() {
        let config = DatastoreConfig::builder("analytics")
            .host("db.internal")
            .port(11433)
            .database("warehouse")
            .credentials("loader", "secret")
            .encrypt(true)
            .persistent(true)
            .connection_timeout(Duration::from_secs(5))
            .request_timeout(Duration::from_secs(30))
            .pool(PoolConfig {
                min: 1,
                max: 4,
                idle_timeout: Duration::from_secs(60),
            })
            .build();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 11433);
        assert_eq!(config.database.as_deref(), Some("warehouse"));
        assert_eq!(config.user.as_deref(), Some("loader"));
        assert!(config.encrypt);
        assert!(config.persistent);
        assert_eq!(config.pool.max, 4);
    }

    // =========================================================================
    // Marshalling Tests
    // =========================================================================

    #[test]
    fn test_marshal_carries_discrete_fields() {
        let driver_config = DatastoreConfig::builder("default")
            .host("db.internal")
            .database("app")
            .credentials("sa", "pw")
            .build()
            .marshal();

        assert!(driver_config.url.is_none());
        assert_eq!(driver_config.host, "db.internal");
        assert_eq!(driver_config.database.as_deref(), Some("app"));
        assert_eq!(driver_config.user.as_deref(), Some("sa"));
        assert_eq!(driver_config.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_marshal_url_precedence() {
        let driver_config = DatastoreConfig::builder("default")
            .url("server=tcp:db.example.com,1433;user=sa")
            .host("ignored-when-url-present")
            .build()
            .marshal();

        assert_eq!(
            driver_config.url.as_deref(),
            Some("server=tcp:db.example.com,1433;user=sa")
        );
    }
}
