//! Load directives for eager loading relations.
//!
//! A load directive names a relation and how many related records to fetch
//! per parent, in which order:
//!
//! ```json
//! {"relationship": "posts", "key": "created_at", "direction": "desc", "limit": 3}
//! ```
//!
//! Only `relationship` is required. The rest default to `key = "id"`,
//! `direction = "ASC"` and `limit = 5`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::normalize::type_name;
use crate::types::SortOrder;

/// Related records fetched per parent when a directive gives no limit.
pub const DEFAULT_LIMIT: u64 = 5;

/// Column related records are ordered by when a directive gives no key.
pub const DEFAULT_ORDER_KEY: &str = "id";

const DIRECTIVE: &str = "load";

/// A resolved load directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSpec {
    /// Name of the relation to load.
    #[serde(rename = "relationship")]
    pub relation: String,
    /// Column the related records are ordered by.
    #[serde(rename = "key")]
    pub order_key: String,
    /// Uppercased direction. Anything but `ASC`/`DESC` is rejected when the
    /// plan is compiled.
    pub direction: String,
    /// Maximum related records per parent.
    pub limit: u64,
}

impl LoadSpec {
    /// Create a load spec with default ordering and limit.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            order_key: DEFAULT_ORDER_KEY.to_string(),
            direction: SortOrder::Asc.as_sql().to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Set the ordering key and direction.
    pub fn order_by(mut self, key: impl Into<String>, order: SortOrder) -> Self {
        self.order_key = key.into();
        self.direction = order.as_sql().to_string();
        self
    }

    /// Set the per-parent limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// The parsed direction, if it is a valid one.
    pub fn sort_order(&self) -> Option<SortOrder> {
        SortOrder::parse(&self.direction)
    }
}

/// Resolve a single load directive, filling defaults.
pub fn resolve_load(raw: &Value) -> QueryResult<LoadSpec> {
    let map = raw.as_object().ok_or_else(|| {
        QueryError::invalid_input(
            DIRECTIVE,
            format!("expected an object, got {}", type_name(raw)),
        )
    })?;
    resolve_load_map(map, DIRECTIVE)
}

/// Resolve a list of load directives, preserving order.
///
/// Accepts an array, a single directive object, or null.
pub fn resolve_loads(raw: &Value) -> QueryResult<Vec<LoadSpec>> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(resolve_load).collect(),
        Value::Object(_) => Ok(vec![resolve_load(raw)?]),
        other => Err(QueryError::invalid_input(
            DIRECTIVE,
            format!("expected a list of load directives, got {}", type_name(other)),
        )),
    }
}

pub(crate) fn resolve_load_map(map: &Map<String, Value>, directive: &str) -> QueryResult<LoadSpec> {
    let relation = required_relation(map, directive)?;

    if map.contains_key("load") {
        return Err(QueryError::unsupported_nesting(relation));
    }

    let order_key = match map.get("key") {
        None | Some(Value::Null) => DEFAULT_ORDER_KEY.to_string(),
        Some(Value::String(key)) if !key.trim().is_empty() => key.trim().to_string(),
        Some(other) => {
            return Err(QueryError::invalid_input(
                format!("{}.key", directive),
                format!("expected a column name, got {}", other),
            ));
        }
    };

    let direction = match map.get("direction") {
        None | Some(Value::Null) => SortOrder::Asc.as_sql().to_string(),
        Some(Value::String(direction)) => direction.trim().to_uppercase(),
        Some(other) => {
            return Err(QueryError::invalid_input(
                format!("{}.direction", directive),
                format!("expected ASC or DESC, got {}", other),
            ));
        }
    };

    let limit = match map.get("limit") {
        None | Some(Value::Null) => DEFAULT_LIMIT,
        Some(value) => parse_limit(value).ok_or_else(|| {
            QueryError::invalid_input(
                format!("{}.limit", directive),
                format!("expected a positive integer, got {}", value),
            )
        })?,
    };

    Ok(LoadSpec {
        relation,
        order_key,
        direction,
        limit,
    })
}

pub(crate) fn required_relation(map: &Map<String, Value>, directive: &str) -> QueryResult<String> {
    match map.get("relationship") {
        None | Some(Value::Null) => Err(QueryError::missing_field(directive, "relationship")),
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.trim().to_string()),
        Some(other) => Err(QueryError::invalid_input(
            format!("{}.relationship", directive),
            format!("expected a relation name, got {}", other),
        )),
    }
}

fn parse_limit(value: &Value) -> Option<u64> {
    let limit = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    (limit > 0).then_some(limit)
}
