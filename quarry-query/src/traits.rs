//! The data store seam.

use futures::future::BoxFuture;

use crate::error::QueryResult;
use crate::filter::FilterValue;

/// A fetched row: column name to value, in projection order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A store able to run parameterized SQL.
///
/// Placeholders are positional `?`; `params` bind in order. Implementations
/// map driver failures onto the data store error family
/// ([`QueryError::is_data_store`](crate::QueryError::is_data_store)).
pub trait QueryEngine: Clone + Send + Sync + 'static {
    /// Run a query and return every row.
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>)
    -> BoxFuture<'_, QueryResult<Vec<Row>>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>>;

    /// Run an INSERT and return the store-assigned row id.
    fn execute_insert(
        &self,
        sql: &str,
        params: Vec<FilterValue>,
    ) -> BoxFuture<'_, QueryResult<i64>>;
}
