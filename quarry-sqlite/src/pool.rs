//! Connection pool for SQLite.
//!
//! SQLite has two distinct sharing models:
//!
//! - In-memory databases: every open handle is its own private database, so
//!   the pool keeps one shared handle and hands out clones of it
//! - File-based databases: handles share the file, so idle handles are
//!   queued and reused

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_rusqlite::Connection;
use tracing::{debug, info, trace};

use crate::config::SqliteConfig;
use crate::connection::{IdleQueue, PooledConnection, SqliteConnection};
use crate::error::{SqliteError, SqliteResult};

/// A connection pool for SQLite.
///
/// # Example
///
/// ```rust,no_run
/// use quarry_sqlite::{SqliteConfig, SqlitePool};
///
/// # async fn demo() -> Result<(), quarry_sqlite::SqliteError> {
/// let pool = SqlitePool::new(SqliteConfig::file("data.db")).await?;
/// let conn = pool.get().await?;
/// conn.execute_batch("CREATE TABLE IF NOT EXISTS t (id INTEGER PRIMARY KEY)").await?;
/// // Returned to the pool on drop
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqlitePool {
    config: Arc<SqliteConfig>,
    semaphore: Arc<Semaphore>,
    idle_connections: IdleQueue,
    /// The one database handle for in-memory databases.
    shared: Option<Connection>,
    pool_config: Arc<PoolConfig>,
    stats: Arc<Mutex<PoolStats>>,
}

/// Statistics about pool usage.
#[derive(Debug, Default, Clone)]
pub struct PoolStats {
    /// Number of connection reuses.
    pub reuses: u64,
    /// Number of new connections opened.
    pub opens: u64,
    /// Number of connections closed due to expiration.
    pub expirations: u64,
}

impl SqlitePool {
    /// Create a new connection pool from configuration.
    pub async fn new(config: SqliteConfig) -> SqliteResult<Self> {
        Self::with_pool_config(config, PoolConfig::default()).await
    }

    /// Create a new connection pool with custom pool configuration.
    pub async fn with_pool_config(
        config: SqliteConfig,
        pool_config: PoolConfig,
    ) -> SqliteResult<Self> {
        if pool_config.max_connections == 0 {
            return Err(SqliteError::config("max_connections must be at least 1"));
        }

        // Opening once up front surfaces a bad path at construction
        let first = Self::open_connection(&config).await?;

        info!(
            path = %config.path_str(),
            max_connections = %pool_config.max_connections,
            "SQLite connection pool created"
        );

        let mut idle = VecDeque::with_capacity(pool_config.max_connections);
        let shared = if config.path.is_memory() {
            Some(first)
        } else {
            idle.push_back(PooledConnection::new(first));
            None
        };

        Ok(Self {
            config: Arc::new(config),
            semaphore: Arc::new(Semaphore::new(pool_config.max_connections)),
            idle_connections: Arc::new(Mutex::new(idle)),
            shared,
            pool_config: Arc::new(pool_config),
            stats: Arc::new(Mutex::new(PoolStats {
                opens: 1,
                ..Default::default()
            })),
        })
    }

    /// Open a new connection with the given configuration.
    async fn open_connection(config: &SqliteConfig) -> SqliteResult<Connection> {
        let init_sql = config.init_sql();

        let conn = if config.path.is_memory() {
            Connection::open_in_memory().await
        } else {
            Connection::open(config.path_str()).await
        }
        .map_err(|e| {
            SqliteError::connection(format!("failed to open '{}': {}", config.path_str(), e))
        })?;

        conn.call(move |conn| Ok(conn.execute_batch(&init_sql)?))
            .await?;

        Ok(conn)
    }

    /// Get a connection from the pool.
    ///
    /// Waits for a free permit, up to the configured connection timeout.
    pub async fn get(&self) -> SqliteResult<SqliteConnection> {
        trace!("Acquiring connection from pool");

        let acquire = self.semaphore.clone().acquire_owned();
        let permit = match self.pool_config.connection_timeout {
            Some(timeout) => tokio::time::timeout(timeout, acquire).await.map_err(|_| {
                SqliteError::pool(format!(
                    "timed out after {:?} waiting for a connection",
                    timeout
                ))
            })?,
            None => acquire.await,
        }
        .map_err(|e| SqliteError::pool(format!("failed to acquire permit: {}", e)))?;

        if let Some(shared) = &self.shared {
            self.stats.lock().reuses += 1;
            return Ok(SqliteConnection::new_pooled(
                shared.clone(),
                permit,
                None,
                Instant::now(),
            ));
        }

        if let Some(pooled) = self.take_idle() {
            return Ok(SqliteConnection::new_pooled(
                pooled.conn,
                permit,
                Some(self.idle_connections.clone()),
                pooled.created_at,
            ));
        }

        debug!("No idle connections, opening new connection");
        let conn = Self::open_connection(&self.config).await?;
        self.stats.lock().opens += 1;
        Ok(SqliteConnection::new_pooled(
            conn,
            permit,
            Some(self.idle_connections.clone()),
            Instant::now(),
        ))
    }

    /// Pop the first unexpired idle connection, dropping expired ones.
    fn take_idle(&self) -> Option<PooledConnection> {
        let mut idle = self.idle_connections.lock();
        let mut stats = self.stats.lock();

        while let Some(pooled) = idle.pop_front() {
            let expired = self
                .pool_config
                .max_lifetime
                .is_some_and(|lifetime| pooled.created_at.elapsed() > lifetime);
            let idle_expired = self
                .pool_config
                .idle_timeout
                .is_some_and(|timeout| pooled.last_used.elapsed() > timeout);

            if expired || idle_expired {
                stats.expirations += 1;
                continue;
            }
            stats.reuses += 1;
            return Some(pooled);
        }
        None
    }

    /// Get the database configuration.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Get the pool settings.
    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool_config
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.lock().clone()
    }

    /// Check that a pooled connection answers a trivial query.
    pub async fn is_healthy(&self) -> bool {
        match self.get().await {
            Ok(conn) => conn.query_params("SELECT 1", Vec::new()).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Get the number of available permits.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the number of idle connections in the pool.
    pub fn idle_count(&self) -> usize {
        self.idle_connections.lock().len()
    }

    /// Create a builder for configuring the pool.
    pub fn builder() -> SqlitePoolBuilder {
        SqlitePoolBuilder::new()
    }
}

/// Configuration for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of concurrently checked-out connections.
    pub max_connections: usize,
    /// How long `get` waits for a free connection.
    pub connection_timeout: Option<Duration>,
    /// Maximum idle time before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime of a connection before it's recycled.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            connection_timeout: Some(Duration::from_secs(30)),
            idle_timeout: Some(Duration::from_secs(300)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

/// Builder for creating a connection pool.
#[derive(Debug, Default)]
pub struct SqlitePoolBuilder {
    config: Option<SqliteConfig>,
    url: Option<String>,
    pool_config: PoolConfig,
}

impl SqlitePoolBuilder {
    /// Create a new pool builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: SqliteConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: usize) -> Self {
        self.pool_config.max_connections = n;
        self
    }

    /// Set the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.connection_timeout = Some(timeout);
        self
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.idle_timeout = Some(timeout);
        self
    }

    /// Build the connection pool.
    pub async fn build(self) -> SqliteResult<SqlitePool> {
        let config = if let Some(config) = self.config {
            config
        } else if let Some(url) = self.url {
            SqliteConfig::from_url(url)?
        } else {
            return Err(SqliteError::config("no database URL or config provided"));
        };

        SqlitePool::with_pool_config(config, self.pool_config).await
    }
}
