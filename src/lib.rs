//! # Quarry
//!
//! Request-driven query specifications compiled into safe relational
//! queries.
//!
//! Quarry provides:
//! - Normalization of loosely typed request fragments (field lists, filters,
//!   sort orders)
//! - Relation loading with per-relation order and per-parent limits
//! - Relation existence filters with key comparisons and one level of nested
//!   loading
//! - Record access by identifier with UUID generation, timestamps and soft
//!   deletes
//! - An async SQLite data store
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use quarry::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), QueryError> {
//! let schema = Arc::new(
//!     Schema::new()
//!         .entity(
//!             EntitySchema::new("User", "users")
//!                 .relation(RelationSpec::one_to_many("posts", "Post", "user_id")),
//!         )
//!         .entity(EntitySchema::new("Post", "posts")),
//! );
//!
//! let engine = SqliteEngine::connect("sqlite::memory:").await?;
//! engine
//!     .execute_batch(
//!         "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
//!          CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT);
//!          INSERT INTO users (name) VALUES ('Ada');
//!          INSERT INTO posts (user_id, title) VALUES (1, 'a'), (1, 'b'), (1, 'c');",
//!     )
//!     .await?;
//!
//! let users = Repository::new(engine, schema, "User")?;
//! let inputs = QueryInputs::from_request(&json!({
//!     "select": "name",
//!     "load": {"relationship": "posts", "limit": 2, "direction": "desc"}
//! }))?;
//!
//! let found = users.find_many(&inputs).await?;
//! assert_eq!(found[0].many("posts").len(), 2);
//! assert_eq!(found[0].many("posts")[0].get_str("title"), Some("c"));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Request normalization, resolution, compilation and record access.
pub mod query {
    pub use quarry_query::*;
}

/// The SQLite data store.
pub mod sqlite {
    pub use quarry_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use quarry_query::prelude::*;
    pub use quarry_sqlite::SqliteEngine;
}

// Re-export key types at the crate root
pub use quarry_query::{QueryError, QueryResult, Repository};
pub use quarry_sqlite::SqliteEngine;
