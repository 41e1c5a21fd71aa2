//! Record access bound to one entity.
//!
//! ```rust,ignore
//! let users = Repository::new(engine, schema, "User")?;
//!
//! let ada = users.create(row(json!({"name": "Ada"}))).await?;
//! let uuid = ada.get_str("uuid").unwrap();
//!
//! users.update(uuid, row(json!({"name": "Ada L."}))).await?;
//! users.delete(uuid).await?;
//! assert!(users.find(uuid).await.unwrap_err().is_not_found());
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::{DebugConfig, QuarryConfig, QueryLimits};
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::plan::{QueryInputs, QueryPlan};
use crate::quarry_debug;
use crate::record::Record;
use crate::schema::{CREATED_AT, DELETED_AT, EntitySchema, KeyType, Schema, UPDATED_AT};
use crate::sql::{self, Statement};
use crate::traits::{QueryEngine, Row};

/// Find, create, update and delete records of one entity.
#[derive(Clone)]
pub struct Repository<E: QueryEngine> {
    engine: E,
    schema: Arc<Schema>,
    entity: String,
    limits: QueryLimits,
    debug: DebugConfig,
}

impl<E: QueryEngine> Repository<E> {
    /// Bind a repository to an entity of the schema.
    pub fn new(engine: E, schema: Arc<Schema>, entity: impl Into<String>) -> QueryResult<Self> {
        let entity = entity.into();
        schema.entity_or_err(&entity)?;
        Ok(Self {
            engine,
            schema,
            entity,
            limits: QueryLimits::default(),
            debug: DebugConfig::default(),
        })
    }

    /// Apply query limits and debug settings from configuration.
    pub fn with_config(mut self, config: &QuarryConfig) -> Self {
        self.limits = config.query;
        self.debug = config.debug.clone();
        self
    }

    /// Override the query limits.
    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The bound entity.
    pub fn entity(&self) -> QueryResult<&EntitySchema> {
        self.schema.entity_or_err(&self.entity)
    }

    /// Compile inputs into a plan without running it.
    pub fn plan(&self, inputs: &QueryInputs) -> QueryResult<QueryPlan> {
        QueryPlan::compile(&self.schema, &self.entity, inputs, &self.limits)
            .map_err(|e| e.with_context(format!("compiling query for {}", self.entity)))
    }

    /// Compile and run a query.
    #[instrument(skip(self, inputs), fields(entity = %self.entity))]
    pub async fn find_many(&self, inputs: &QueryInputs) -> QueryResult<Vec<Record>> {
        let plan = self.plan(inputs)?;
        if self.debug.log_queries {
            let stmt = plan.to_statement();
            debug!(sql = %stmt.sql, params = ?stmt.params, "find_many");
        }

        let start = Instant::now();
        let records = plan.execute(&self.engine).await?;
        let elapsed_ms = start.elapsed().as_millis();

        if elapsed_ms > u128::from(self.debug.slow_query_threshold) {
            warn!(
                entity = %self.entity,
                elapsed_ms = %elapsed_ms,
                threshold_ms = self.debug.slow_query_threshold,
                "Slow query detected"
            );
        }

        Ok(records)
    }

    /// Find a record by identifier.
    #[instrument(skip(self, id), fields(entity = %self.entity))]
    pub async fn find(&self, id: impl Into<FilterValue>) -> QueryResult<Record> {
        let entity = self.entity()?;
        self.fetch_one(entity, entity.identifier(), id.into())
            .await?
            .ok_or_else(|| QueryError::not_found(&entity.name))
    }

    /// Insert a record and return it as stored.
    ///
    /// Empty UUID identifier columns receive a fresh v4 UUID first.
    #[instrument(skip(self, data), fields(entity = %self.entity))]
    pub async fn create(&self, mut data: Row) -> QueryResult<Record> {
        let entity = self.entity()?;

        for column in entity.generated_uuid_columns() {
            if is_empty(data.get(column)) {
                let uuid = Uuid::new_v4().to_string();
                quarry_debug!(entity = %entity.name, column = column, uuid = %uuid, "Generated identifier");
                data.insert(column.to_string(), Value::String(uuid));
            }
        }

        if entity.timestamps {
            let now = now();
            for column in [CREATED_AT, UPDATED_AT] {
                if is_empty(data.get(column)) {
                    data.insert(column.to_string(), Value::String(now.clone()));
                }
            }
        }

        let stmt = sql::insert(&entity.table, &data);
        self.log(&stmt);
        let rowid = self.engine.execute_insert(&stmt.sql, stmt.params).await?;

        let (column, value) = match non_empty(&data, entity.identifier()) {
            Some(value) => (entity.identifier(), value),
            None => match non_empty(&data, &entity.primary_key) {
                Some(value) => (entity.primary_key.as_str(), value),
                None if entity.key_type == KeyType::Integer => {
                    (entity.primary_key.as_str(), FilterValue::Int(rowid))
                }
                None => {
                    return Err(QueryError::missing_field(&entity.name, &entity.primary_key));
                }
            },
        };

        self.fetch_one(entity, column, value).await?.ok_or_else(|| {
            QueryError::internal(format!("inserted {} record could not be read back", entity.name))
        })
    }

    /// Update a record by identifier and return it as stored.
    #[instrument(skip(self, id, data), fields(entity = %self.entity))]
    pub async fn update(&self, id: impl Into<FilterValue>, mut data: Row) -> QueryResult<Record> {
        let entity = self.entity()?;
        let id = id.into();

        let current = self
            .fetch_one(entity, entity.identifier(), id.clone())
            .await?
            .ok_or_else(|| QueryError::not_found(&entity.name))?;
        if data.is_empty() {
            return Ok(current);
        }

        if entity.timestamps && is_empty(data.get(UPDATED_AT)) {
            data.insert(UPDATED_AT.to_string(), Value::String(now()));
        }

        let stmt = sql::update(entity, &data, entity.identifier(), id.clone());
        self.log(&stmt);
        let affected = self.engine.execute(&stmt.sql, stmt.params).await?;
        if affected == 0 {
            return Err(QueryError::not_found(&entity.name));
        }

        let lookup = non_empty(&data, entity.identifier()).unwrap_or(id);
        self.fetch_one(entity, entity.identifier(), lookup)
            .await?
            .ok_or_else(|| QueryError::not_found(&entity.name))
    }

    /// Delete a record by identifier.
    ///
    /// Soft-deletable entities get `deleted_at` set instead.
    #[instrument(skip(self, id), fields(entity = %self.entity))]
    pub async fn delete(&self, id: impl Into<FilterValue>) -> QueryResult<bool> {
        let entity = self.entity()?;
        let id = id.into();

        let stmt = if entity.soft_deletes {
            let now = now();
            let mut data = Row::new();
            data.insert(DELETED_AT.to_string(), Value::String(now.clone()));
            if entity.timestamps {
                data.insert(UPDATED_AT.to_string(), Value::String(now));
            }
            sql::update(entity, &data, entity.identifier(), id)
        } else {
            sql::delete(entity, entity.identifier(), id)
        };

        self.log(&stmt);
        let affected = self.engine.execute(&stmt.sql, stmt.params).await?;
        if affected == 0 {
            return Err(QueryError::not_found(&entity.name));
        }
        Ok(true)
    }

    async fn fetch_one(
        &self,
        entity: &EntitySchema,
        column: &str,
        value: FilterValue,
    ) -> QueryResult<Option<Record>> {
        let stmt = sql::find_by(entity, column, value);
        self.log(&stmt);
        let rows = self.engine.query_rows(&stmt.sql, stmt.params).await?;
        Ok(rows.into_iter().next().map(Record::new))
    }

    fn log(&self, stmt: &Statement) {
        if self.debug.log_queries {
            debug!(entity = %self.entity, sql = %stmt.sql, params = ?stmt.params, "Executing statement");
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn non_empty(data: &Row, column: &str) -> Option<FilterValue> {
    let value = data.get(column);
    if is_empty(value) {
        None
    } else {
        value.map(FilterValue::from_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::relations::RelationSpec;
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every query with the same rows and every statement with the
    /// same affected count.
    #[derive(Clone)]
    struct FixedEngine {
        rows: Vec<Row>,
        affected: u64,
        log: Arc<Mutex<Vec<(String, Vec<FilterValue>)>>>,
    }

    impl FixedEngine {
        fn new(rows: Value, affected: u64) -> Self {
            Self {
                rows: rows
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|r| r.as_object().cloned())
                    .collect(),
                affected,
                log: Arc::default(),
            }
        }

        fn statements(&self) -> Vec<(String, Vec<FilterValue>)> {
            self.log.lock().unwrap().clone()
        }
    }

    impl QueryEngine for FixedEngine {
        fn query_rows(
            &self,
            sql: &str,
            params: Vec<FilterValue>,
        ) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
            self.log.lock().unwrap().push((sql.to_string(), params));
            let rows = self.rows.clone();
            Box::pin(async move { Ok(rows) })
        }

        fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
            self.log.lock().unwrap().push((sql.to_string(), params));
            let affected = self.affected;
            Box::pin(async move { Ok(affected) })
        }

        fn execute_insert(
            &self,
            sql: &str,
            params: Vec<FilterValue>,
        ) -> BoxFuture<'_, QueryResult<i64>> {
            self.log.lock().unwrap().push((sql.to_string(), params));
            Box::pin(async { Ok(42) })
        }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new()
                .entity(
                    EntitySchema::new("User", "users")
                        .uuid_column("uuid")
                        .soft_deletes()
                        .timestamps()
                        .relation(RelationSpec::one_to_many("posts", "Post", "user_id")),
                )
                .entity(EntitySchema::new("Post", "posts")),
        )
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_new_rejects_unknown_entity() {
        let engine = FixedEngine::new(json!([]), 0);
        let err = Repository::new(engine, schema(), "Order").err().unwrap();
        assert_eq!(err.code, ErrorCode::InvalidRelation);
    }

    #[test]
    fn test_plan_applies_configured_limits() {
        let engine = FixedEngine::new(json!([]), 0);
        let config = QuarryConfig::from_str("[query]\nmax_relation_limit = 2\n").unwrap();
        let repo = Repository::new(engine, schema(), "User").unwrap().with_config(&config);

        let inputs = QueryInputs::from_request(&json!({"load": [{"relationship": "posts"}]})).unwrap();
        let err = repo.plan(&inputs).unwrap_err();
        assert_eq!(err.code, ErrorCode::LimitExceeded);
        assert!(err.context.operation.is_some());
    }

    #[tokio::test]
    async fn test_create_generates_uuid_and_timestamps() {
        let engine = FixedEngine::new(json!([{"id": 42, "uuid": "stored"}]), 1);
        let repo = Repository::new(engine.clone(), schema(), "User").unwrap();

        let record = repo.create(row(json!({"name": "Ada", "uuid": ""}))).await.unwrap();
        assert_eq!(record.get_str("uuid"), Some("stored"));

        let statements = engine.statements();
        let (insert_sql, insert_params) = &statements[0];
        assert!(insert_sql.starts_with("INSERT INTO \"users\""));
        assert!(insert_sql.contains("\"created_at\""));
        assert!(insert_sql.contains("\"updated_at\""));

        let FilterValue::String(ref uuid) = insert_params[1] else {
            panic!("expected generated uuid, got {:?}", insert_params[1]);
        };
        assert!(Uuid::parse_str(uuid).is_ok());

        // read back by the generated uuid
        assert_eq!(statements[1].1, vec![FilterValue::String(uuid.clone())]);
    }

    #[tokio::test]
    async fn test_create_reads_back_integer_key() {
        let schema = Arc::new(Schema::new().entity(EntitySchema::new("Post", "posts")));
        let engine = FixedEngine::new(json!([{"id": 42, "title": "Hello"}]), 1);
        let repo = Repository::new(engine.clone(), schema, "Post").unwrap();

        let record = repo.create(row(json!({"title": "Hello"}))).await.unwrap();
        assert_eq!(record.get_i64("id"), Some(42));
        assert_eq!(engine.statements()[1].1, vec![FilterValue::Int(42)]);
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let engine = FixedEngine::new(json!([]), 0);
        let repo = Repository::new(engine, schema(), "User").unwrap();
        let err = repo.find("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_are_not_found() {
        let engine = FixedEngine::new(json!([]), 0);
        let repo = Repository::new(engine.clone(), schema(), "User").unwrap();

        assert!(repo.update("nope", row(json!({"name": "x"}))).await.unwrap_err().is_not_found());
        assert!(repo.delete("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_with_empty_data_returns_current() {
        let engine = FixedEngine::new(json!([{"uuid": "u1", "name": "Ada"}]), 1);
        let repo = Repository::new(engine.clone(), schema(), "User").unwrap();

        let record = repo.update("u1", Row::new()).await.unwrap();
        assert_eq!(record.get_str("name"), Some("Ada"));
        assert_eq!(engine.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_sets_deleted_at() {
        let engine = FixedEngine::new(json!([]), 1);
        let repo = Repository::new(engine.clone(), schema(), "User").unwrap();

        assert!(repo.delete("u1").await.unwrap());
        let (sql, params) = &engine.statements()[0];
        assert!(sql.starts_with("UPDATE \"users\" SET \"deleted_at\" = ?, \"updated_at\" = ?"));
        assert!(sql.ends_with("WHERE \"uuid\" = ? AND \"deleted_at\" IS NULL"));
        assert_eq!(params[2], FilterValue::String("u1".into()));
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(None));
        assert!(is_empty(Some(&json!(null))));
        assert!(is_empty(Some(&json!(""))));
        assert!(!is_empty(Some(&json!(0))));
        assert!(!is_empty(Some(&json!("x"))));
    }
}
