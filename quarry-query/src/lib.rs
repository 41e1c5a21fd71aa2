//! # quarry-query
//!
//! Request-driven query specifications for the Quarry data layer.
//!
//! This crate turns loosely typed request fragments into safe, composed
//! queries:
//! - Normalization of field lists, filters and sort orders
//! - Load directives (`load`) with per-relation order and per-parent limit
//! - Existence filters (`where_has`) with key comparisons and nested loads
//! - Query plan compilation against a caller-supplied entity schema
//! - Plan execution with batched eager loading
//! - Record access by identifier (`find`, `create`, `update`, `delete`)
//!
//! The data store sits behind the [`QueryEngine`] trait; `quarry-sqlite`
//! provides the SQLite implementation.
//!
//! ## Request Fragments
//!
//! ```rust
//! use quarry_query::normalize::normalize_list;
//! use quarry_query::relations::{resolve_existence, resolve_load};
//! use serde_json::json;
//!
//! let fields = normalize_list(Some(&json!("id, name ,email"))).unwrap();
//! assert_eq!(fields, vec!["id", "name", "email"]);
//!
//! let load = resolve_load(&json!({"relationship": "posts"})).unwrap();
//! assert_eq!((load.order_key.as_str(), load.direction.as_str(), load.limit), ("id", "ASC", 5));
//!
//! let exists = resolve_existence(&json!({"relationship": "posts", "operator": "gt", "value": 10})).unwrap();
//! assert!(!exists.negate);
//! ```
//!
//! ## Whole Requests
//!
//! ```rust
//! use quarry_query::QueryInputs;
//! use serde_json::json;
//!
//! let inputs = QueryInputs::from_request(&json!({
//!     "select": "id,name",
//!     "filters": {"role": "admin"},
//!     "load": [{"relationship": "posts", "limit": 3, "direction": "desc"}],
//!     "where_has": [{"relationship": "posts", "operator": "gt", "value": 5, "not": true}],
//!     "sort": {"name": "asc"}
//! }))
//! .unwrap();
//!
//! assert_eq!(inputs.loads[0].limit, 3);
//! assert!(inputs.exists[0].negate);
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use quarry_query::relations::resolve_load;
//! use serde_json::json;
//!
//! let err = resolve_load(&json!({})).unwrap_err();
//! assert!(err.is_validation());
//! assert!(err.to_string().contains("Q1005"));
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod logging;
pub mod normalize;
pub mod plan;
pub mod record;
pub mod relations;
pub mod repository;
pub mod schema;
pub mod sql;
pub mod traits;
pub mod types;

pub use config::{ConfigError, QuarryConfig, QueryLimits};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{Filter, FilterValue};
pub use normalize::{normalize_filters, normalize_list, normalize_sort};
pub use plan::{QueryInputs, QueryPlan};
pub use record::{Record, Related};
pub use relations::{
    ComparisonOperator, ExistenceSpec, LoadSpec, RelationSpec, RelationType, resolve_existence,
    resolve_existence_list, resolve_load, resolve_loads,
};
pub use repository::Repository;
pub use schema::{EntitySchema, KeyType, Schema};
pub use sql::Statement;
pub use traits::{QueryEngine, Row};
pub use types::{FieldList, FilterMap, GroupKeys, OrderByField, SortOrder, SortSpec};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, init_with_level, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::FilterValue;
    pub use crate::plan::QueryInputs;
    pub use crate::record::{Record, Related};
    pub use crate::relations::{ComparisonOperator, ExistenceSpec, LoadSpec, RelationSpec};
    pub use crate::repository::Repository;
    pub use crate::schema::{EntitySchema, KeyType, Schema};
    pub use crate::traits::{QueryEngine, Row};
    pub use crate::types::SortOrder;
}
