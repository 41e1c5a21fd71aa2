//! Integration tests for configuration parsing and handling.
//!
//! These tests verify that `quarry.toml` settings reach the engine and the
//! repositories built from it.

mod common;

use std::io::Write;

use common::{schema, seeded_engine};
use quarry::prelude::*;
use quarry::query::config::{CONFIG_FILE, QuarryConfig};
use serde_json::json;

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let config = QuarryConfig::from_str(
        r#"
        [database]
        url = "sqlite::memory:"
    "#,
    )
    .unwrap();

    assert_eq!(config.database_url(), Some("sqlite::memory:"));
    assert!(config.query.max_relation_limit.is_none());
    assert!(!config.debug.log_queries);
    assert_eq!(config.debug.slow_query_threshold, 1000);
}

/// Test full configuration with every section
#[test]
fn test_config_full() {
    let config = QuarryConfig::from_str(
        r#"
        [database]
        url = "sqlite://./app.db"

        [query]
        max_relation_limit = 100
        max_eager_loads = 10

        [debug]
        log_queries = true
        slow_query_threshold = 250

        [environments.test.database]
        url = "sqlite::memory:"

        [environments.test.query]
        max_relation_limit = 20
    "#,
    )
    .unwrap();

    assert_eq!(config.query.max_relation_limit, Some(100));
    assert_eq!(config.query.max_eager_loads, Some(10));
    assert!(config.debug.log_queries);

    let test = config.with_environment("test");
    assert_eq!(test.database_url(), Some("sqlite::memory:"));
    assert_eq!(test.query.max_relation_limit, Some(20));
    assert_eq!(test.query.max_eager_loads, Some(10));
    assert_eq!(test.debug.slow_query_threshold, 250);
}

/// Unknown keys are rejected
#[test]
fn test_config_rejects_unknown_keys() {
    let err = QuarryConfig::from_str("[database]\nprovider = \"sqlite\"\n").unwrap_err();
    assert!(err.to_string().contains("invalid configuration"));

    let err: QueryError = err.into();
    assert!(err.to_string().contains("Q7001"));
}

/// Unset variables are left as written
#[test]
fn test_config_keeps_unset_env_vars() {
    let config = QuarryConfig::from_str(
        "[database]\nurl = \"${QUARRY_INTEGRATION_SURELY_UNSET}\"\n",
    )
    .unwrap();
    assert_eq!(config.database_url(), Some("${QUARRY_INTEGRATION_SURELY_UNSET}"));
}

#[tokio::test]
async fn test_engine_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    let db = dir.path().join("configured.db");

    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[database]\nurl = \"sqlite://{}\"", db.display()).unwrap();

    let config = QuarryConfig::from_file(&path).unwrap();
    let engine = SqliteEngine::from_config(&config).await.unwrap();
    engine.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)").await.unwrap();

    assert!(db.exists());
}

#[test]
fn test_missing_config_file() {
    let err = QuarryConfig::from_file("/definitely/not/here/quarry.toml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here/quarry.toml"));
}

#[tokio::test]
async fn test_repository_applies_configured_limits() {
    let config = QuarryConfig::from_str(
        r#"
        [query]
        max_relation_limit = 2

        [debug]
        log_queries = true
    "#,
    )
    .unwrap();

    let users = Repository::new(seeded_engine().await, schema(), "User")
        .unwrap()
        .with_config(&config);

    let too_big = QueryInputs::from_request(&json!({
        "load": {"relationship": "posts", "limit": 3}
    }))
    .unwrap();
    let err = users.find_many(&too_big).await.unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("Q1008"));

    let ok = QueryInputs::from_request(&json!({
        "filters": {"id": 1},
        "load": {"relationship": "posts", "limit": 2}
    }))
    .unwrap();
    let found = users.find_many(&ok).await.unwrap();
    assert_eq!(found[0].many("posts").len(), 2);
}
