//! SQLite data store for Quarry.
//!
//! This crate implements [`quarry_query::QueryEngine`] on top of
//! `tokio-rusqlite`, so compiled query plans and repositories can run
//! against SQLite.
//!
//! # Features
//!
//! - Async/await support via `tokio-rusqlite`
//! - Connection pooling with a shared handle for in-memory databases
//! - URL configuration (`sqlite::memory:`, `sqlite://path`, `file:path`)
//!
//! # Example
//!
//! ```rust
//! use quarry_query::QueryEngine;
//! use quarry_sqlite::SqliteEngine;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), quarry_query::QueryError> {
//! let engine = SqliteEngine::connect("sqlite::memory:").await?;
//! engine.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").await?;
//! engine
//!     .execute("INSERT INTO users (name) VALUES (?)", vec!["Ada".into()])
//!     .await?;
//!
//! let rows = engine.query_rows("SELECT name FROM users", Vec::new()).await?;
//! assert_eq!(rows[0]["name"], "Ada");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod pool;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig};
pub use connection::SqliteConnection;
pub use engine::SqliteEngine;
pub use error::{SqliteError, SqliteResult};
pub use pool::{PoolConfig, PoolStats, SqlitePool, SqlitePoolBuilder};
