//! SQLite query engine implementation.

use futures::future::BoxFuture;
use tracing::{debug, instrument};

use quarry_query::config::QuarryConfig;
use quarry_query::error::{QueryError, QueryResult};
use quarry_query::filter::FilterValue;
use quarry_query::traits::{QueryEngine, Row};

use crate::config::SqliteConfig;
use crate::pool::SqlitePool;
use crate::types::filter_value_to_sqlite;

/// SQLite query engine.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Clone)]
pub struct SqliteEngine {
    pool: SqlitePool,
}

impl SqliteEngine {
    /// Create a new SQLite engine with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url` and wrap it.
    pub async fn connect(url: &str) -> QueryResult<Self> {
        let config = SqliteConfig::from_url(url)?;
        let pool = SqlitePool::new(config).await?;
        Ok(Self::new(pool))
    }

    /// Open the database named by `database.url` in a loaded config.
    pub async fn from_config(config: &QuarryConfig) -> QueryResult<Self> {
        let url = config.database_url().ok_or_else(|| {
            QueryError::configuration("database.url is not set")
                .with_help(format!("Set [database] url in {}", quarry_query::config::CONFIG_FILE))
        })?;
        Self::connect(url).await
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run a batch of statements without parameters, such as DDL.
    #[instrument(skip(self, sql))]
    pub async fn execute_batch(&self, sql: &str) -> QueryResult<()> {
        let conn = self.pool.get().await?;
        conn.execute_batch(sql).await?;
        Ok(())
    }

    #[instrument(skip(self, sql, params), fields(params = params.len()))]
    async fn fetch(&self, sql: String, params: Vec<FilterValue>) -> QueryResult<Vec<Row>> {
        debug!(sql = %sql, "SQLite query");
        let params = params.iter().map(filter_value_to_sqlite).collect();
        let conn = self.pool.get().await?;
        let rows = conn
            .query_params(&sql, params)
            .await
            .map_err(|e| QueryError::from(e).with_sql(&sql))?;
        debug!(rows = rows.len(), "SQLite query complete");
        Ok(rows)
    }

    #[instrument(skip(self, sql, params), fields(params = params.len()))]
    async fn run(&self, sql: String, params: Vec<FilterValue>) -> QueryResult<u64> {
        debug!(sql = %sql, "SQLite execute");
        let params = params.iter().map(filter_value_to_sqlite).collect();
        let conn = self.pool.get().await?;
        let affected = conn
            .execute_params(&sql, params)
            .await
            .map_err(|e| QueryError::from(e).with_sql(&sql))?;
        Ok(affected as u64)
    }

    #[instrument(skip(self, sql, params), fields(params = params.len()))]
    async fn insert(&self, sql: String, params: Vec<FilterValue>) -> QueryResult<i64> {
        debug!(sql = %sql, "SQLite insert");
        let params = params.iter().map(filter_value_to_sqlite).collect();
        let conn = self.pool.get().await?;
        let id = conn
            .execute_insert_params(&sql, params)
            .await
            .map_err(|e| QueryError::from(e).with_sql(&sql))?;
        Ok(id)
    }
}

impl QueryEngine for SqliteEngine {
    fn query_rows(
        &self,
        sql: &str,
        params: Vec<FilterValue>,
    ) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let sql = sql.to_string();
        Box::pin(self.fetch(sql, params))
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let sql = sql.to_string();
        Box::pin(self.run(sql, params))
    }

    fn execute_insert(
        &self,
        sql: &str,
        params: Vec<FilterValue>,
    ) -> BoxFuture<'_, QueryResult<i64>> {
        let sql = sql.to_string();
        Box::pin(self.insert(sql, params))
    }
}
