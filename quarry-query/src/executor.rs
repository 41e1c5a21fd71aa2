//! Plan execution.
//!
//! The root statement runs first. Each eager load then runs once per batch
//! of parent keys, nested loads recurse over the fetched children, and the
//! related records are attached to their parents by key.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::plan::{EagerLoad, QueryPlan};
use crate::record::{Record, Related};
use crate::sql::{self, RANK_COLUMN};
use crate::traits::QueryEngine;

/// Parent keys bound per relation statement.
const KEY_BATCH_SIZE: usize = 500;

impl QueryPlan {
    /// Run the plan and materialize every matching record.
    pub async fn execute<E: QueryEngine>(&self, engine: &E) -> QueryResult<Vec<Record>> {
        let stmt = self.to_statement();
        debug!(entity = %self.entity, sql = %stmt.sql, params = stmt.params.len(), "Executing root query");

        let rows = engine
            .query_rows(&stmt.sql, stmt.params)
            .await
            .map_err(|e| e.with_entity(&self.entity))?;
        let mut records: Vec<Record> = rows.into_iter().map(Record::new).collect();

        load_relations(engine, &mut records, &self.loads).await?;

        if !self.hidden.is_empty() {
            for record in &mut records {
                for column in &self.hidden {
                    record.fields.shift_remove(column);
                }
            }
        }

        Ok(records)
    }
}

fn load_relations<'a, E: QueryEngine>(
    engine: &'a E,
    parents: &'a mut [Record],
    loads: &'a [EagerLoad],
) -> BoxFuture<'a, QueryResult<()>> {
    Box::pin(async move {
        for load in loads {
            if load.empty || parents.is_empty() {
                attach_empty(parents, load);
                continue;
            }

            let keys = parent_keys(parents, &load.local_key);
            if keys.is_empty() {
                attach_empty(parents, load);
                continue;
            }

            let mut children = Vec::new();
            for batch in keys.chunks(KEY_BATCH_SIZE) {
                let stmt = sql::load(load, batch);
                debug!(relation = %load.name, sql = %stmt.sql, keys = batch.len(), "Loading relation");
                let rows = engine.query_rows(&stmt.sql, stmt.params).await?;
                children.extend(rows.into_iter().map(|mut row| {
                    row.shift_remove(RANK_COLUMN);
                    Record::new(row)
                }));
            }
            trace!(relation = %load.name, count = children.len(), "Relation rows fetched");

            load_relations(engine, &mut children, &load.nested).await?;

            let mut groups: IndexMap<String, Vec<Record>> = IndexMap::new();
            for child in children {
                if let Some(key) = child.get(&load.foreign_key).and_then(match_key) {
                    groups.entry(key).or_default().push(child);
                }
            }

            for parent in parents.iter_mut() {
                let matched = parent
                    .get(&load.local_key)
                    .and_then(match_key)
                    .and_then(|key| groups.get(&key))
                    .cloned()
                    .unwrap_or_default();
                let related = if load.relation_type.is_many() {
                    Related::Many(matched)
                } else {
                    Related::One(matched.into_iter().next().map(Box::new))
                };
                parent.relations.insert(load.name.clone(), related);
            }
        }
        Ok(())
    })
}

fn attach_empty(parents: &mut [Record], load: &EagerLoad) {
    for parent in parents.iter_mut() {
        let related = if load.relation_type.is_many() {
            Related::Many(Vec::new())
        } else {
            Related::One(None)
        };
        parent.relations.insert(load.name.clone(), related);
    }
}

/// Distinct non-null key values of the parents, in first-seen order.
fn parent_keys(parents: &[Record], column: &str) -> Vec<FilterValue> {
    let mut seen: IndexMap<String, FilterValue> = IndexMap::new();
    for parent in parents {
        if let Some(value) = parent.get(column) {
            if let Some(key) = match_key(value) {
                seen.entry(key).or_insert_with(|| FilterValue::from_json(value));
            }
        }
    }
    seen.into_values().collect()
}

/// Canonical form used to match a parent key with a related key.
///
/// Integral floats compare equal to the integer. Text is kept verbatim, so
/// `"0012"` and `"12"` stay distinct keys.
fn match_key(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(b) => Some(i64::from(*b).to_string()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            _ => n.to_string(),
        }),
        Value::String(s) => Some(format!("s:{}", s)),
    }
}
