//! SQLite connection wrapper.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rusqlite::types::Value;
use tokio::sync::OwnedSemaphorePermit;
use tokio_rusqlite::Connection;
use tracing::{debug, trace};

use quarry_query::traits::Row;

use crate::error::{SqliteError, SqliteResult};
use crate::types::row_to_map;

/// An idle connection waiting in the pool.
pub(crate) struct PooledConnection {
    pub conn: Connection,
    pub created_at: Instant,
    pub last_used: Instant,
}

impl PooledConnection {
    pub fn new(conn: Connection) -> Self {
        let now = Instant::now();
        Self {
            conn,
            created_at: now,
            last_used: now,
        }
    }
}

pub(crate) type IdleQueue = Arc<Mutex<VecDeque<PooledConnection>>>;

/// A connection checked out of a [`SqlitePool`](crate::SqlitePool).
///
/// Holding one occupies a pool permit; dropping it releases the permit and,
/// for file databases, returns the connection to the idle queue.
pub struct SqliteConnection {
    conn: Connection,
    _permit: OwnedSemaphorePermit,
    return_to_pool: Option<IdleQueue>,
    created_at: Instant,
}

impl SqliteConnection {
    pub(crate) fn new_pooled(
        conn: Connection,
        permit: OwnedSemaphorePermit,
        return_to_pool: Option<IdleQueue>,
        created_at: Instant,
    ) -> Self {
        Self {
            conn,
            _permit: permit,
            return_to_pool,
            created_at,
        }
    }

    /// Execute a query with parameters and return all rows.
    pub async fn query_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<Vec<Row>> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing parameterized query");

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt
                    .column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();

                let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(row_to_map(row, &columns))
                })?;

                let results: Result<Vec<_>, _> = rows.collect();
                Ok(results?)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Execute a statement with parameters and return the number of affected rows.
    pub async fn execute_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<usize> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing parameterized statement");

        self.conn
            .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?))
            .await
            .map_err(SqliteError::from)
    }

    /// Execute a statement with parameters and return the last insert rowid.
    pub async fn execute_insert_params(
        &self,
        sql: &str,
        params: Vec<Value>,
    ) -> SqliteResult<i64> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing parameterized insert");

        self.conn
            .call(move |conn| {
                conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Execute multiple statements in a batch.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");

        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from)
    }

    /// Get the inner connection.
    pub fn inner(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if let Some(pool) = self.return_to_pool.take() {
            trace!("Returning connection to pool");
            pool.lock().push_back(PooledConnection {
                conn: self.conn.clone(),
                created_at: self.created_at,
                last_used: Instant::now(),
            });
        }
    }
}
