//! Relation directives and relation metadata.
//!
//! - `LoadSpec` for eager loading a relation with its own order and limit
//! - `ExistenceSpec` for keeping parents that have (or lack) related records
//! - `RelationSpec` describing how two entities are joined
//!
//! ## Example
//!
//! ```rust
//! use quarry_query::relations::{resolve_existence, resolve_loads};
//! use serde_json::json;
//!
//! let loads = resolve_loads(&json!([{"relationship": "posts", "limit": 3}])).unwrap();
//! assert_eq!(loads[0].direction, "ASC");
//!
//! let exists = resolve_existence(&json!({"relationship": "posts", "operator": "gt", "value": 5})).unwrap();
//! assert!(exists.has_comparison());
//! ```

mod exists;
mod load;
mod spec;

pub use exists::{ComparisonOperator, ExistenceSpec, resolve_existence, resolve_existence_list};
pub use load::{DEFAULT_LIMIT, DEFAULT_ORDER_KEY, LoadSpec, resolve_load, resolve_loads};
pub use spec::{RelationRegistry, RelationSpec, RelationType};
