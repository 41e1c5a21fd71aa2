//! Integration tests for record access by identifier.
//!
//! These tests verify:
//! - Identifier generation on create
//! - Timestamps on create and update
//! - Not-found handling for update and delete
//! - Soft deletes across lookups, queries and existence filters
//! - File-backed databases

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{FIXTURE_DATA, FIXTURE_DDL, empty_engine, names, row, schema, seeded_engine, titles, users};
use pretty_assertions::assert_eq;
use quarry::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_create_generates_unique_identifiers() {
    let users = Repository::new(empty_engine().await, schema(), "User").unwrap();

    let first = users.create(row(json!({"name": "Eve", "role": "user"}))).await.unwrap();
    let second = users.create(row(json!({"name": "Eve", "uuid": ""}))).await.unwrap();

    let a = first.get_str("uuid").unwrap();
    let b = second.get_str("uuid").unwrap();
    assert!(!a.is_empty());
    assert!(!b.is_empty());
    assert_ne!(a, b);

    assert_eq!(first.get_i64("id"), Some(1));
    assert_eq!(second.get_i64("id"), Some(2));
    assert!(first.get_str("created_at").is_some());
    assert_eq!(first.get("created_at"), first.get("updated_at"));
    assert_eq!(first.get("deleted_at"), Some(&serde_json::Value::Null));

    let found = users.find(a).await.unwrap();
    assert_eq!(found.get_str("name"), Some("Eve"));
}

#[tokio::test]
async fn test_many_creates_never_collide() {
    let users = Repository::new(empty_engine().await, schema(), "User").unwrap();

    let mut seen = HashSet::new();
    for i in 0..25 {
        let record = users
            .create(row(json!({"name": format!("user-{}", i)})))
            .await
            .unwrap();
        assert!(seen.insert(record.get_str("uuid").unwrap().to_string()));
    }
    assert_eq!(seen.len(), 25);
}

#[tokio::test]
async fn test_create_keeps_supplied_identifier() {
    let users = Repository::new(empty_engine().await, schema(), "User").unwrap();

    let record = users
        .create(row(json!({"uuid": "fixed-uuid", "name": "Fay"})))
        .await
        .unwrap();
    assert_eq!(record.get_str("uuid"), Some("fixed-uuid"));
}

#[tokio::test]
async fn test_create_recovers_integer_key() {
    let posts = Repository::new(seeded_engine().await, schema(), "Post").unwrap();

    let post = posts
        .create(row(json!({"user_id": 4, "title": "hello"})))
        .await
        .unwrap();
    assert_eq!(post.get_i64("id"), Some(8));
    assert_eq!(posts.find(8).await.unwrap().get_str("title"), Some("hello"));
}

#[tokio::test]
async fn test_create_generates_uuid_primary_key() {
    let engine = empty_engine().await;
    engine
        .execute_batch("CREATE TABLE tokens (id TEXT PRIMARY KEY, label TEXT);")
        .await
        .unwrap();
    let schema = Arc::new(
        Schema::new().entity(EntitySchema::new("Token", "tokens").key_type(KeyType::Uuid)),
    );
    let tokens = Repository::new(engine, schema, "Token").unwrap();

    let token = tokens.create(row(json!({"label": "api"}))).await.unwrap();
    let id = token.get_str("id").unwrap().to_string();
    assert_eq!(id.len(), 36);
    assert_eq!(tokens.find(id.as_str()).await.unwrap().get_str("label"), Some("api"));
}

#[tokio::test]
async fn test_update_by_identifier() {
    let users = users().await;

    let updated = users
        .update("u-bob", row(json!({"name": "Robert"})))
        .await
        .unwrap();
    assert_eq!(updated.get_str("name"), Some("Robert"));
    assert_eq!(updated.get_str("role"), Some("user"));
    assert!(updated.get_str("updated_at").is_some());

    let unchanged = users.update("u-cy", Row::new()).await.unwrap();
    assert_eq!(unchanged.get_str("name"), Some("Cy"));
    assert_eq!(unchanged.get("updated_at"), Some(&serde_json::Value::Null));
}

#[tokio::test]
async fn test_update_and_delete_missing_are_not_found() {
    let users = users().await;

    let err = users
        .update("missing", row(json!({"name": "Nobody"})))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = users.delete("missing").await.unwrap_err();
    assert!(err.is_not_found());

    let err = users.find("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Q1001"));
}

#[tokio::test]
async fn test_soft_delete_hides_record() {
    let engine = seeded_engine().await;
    let users = Repository::new(engine.clone(), schema(), "User").unwrap();

    assert!(users.delete("u-ada").await.unwrap());

    assert!(users.find("u-ada").await.unwrap_err().is_not_found());
    assert!(users.delete("u-ada").await.unwrap_err().is_not_found());
    assert!(
        users
            .update("u-ada", row(json!({"name": "Ghost"})))
            .await
            .unwrap_err()
            .is_not_found()
    );

    let all = users
        .find_many(&QueryInputs::new().sort("id", SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(names(&all), vec!["Bob", "Cy", "Dee"]);

    // the row is still stored
    let rows = engine
        .query_rows("SELECT name, deleted_at FROM users WHERE uuid = ?", vec!["u-ada".into()])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["deleted_at"].is_string());
}

#[tokio::test]
async fn test_soft_deleted_rows_skip_relations() {
    let engine = seeded_engine().await;
    let users = Repository::new(engine.clone(), schema(), "User").unwrap();
    users.delete("u-bob").await.unwrap();

    let posts = Repository::new(engine, schema(), "Post").unwrap();

    let with_author = QueryInputs::new()
        .exists(ExistenceSpec::new("author"))
        .sort("id", SortOrder::Asc);
    assert_eq!(
        titles(&posts.find_many(&with_author).await.unwrap()),
        vec!["p1", "p2", "p3", "p4", "p7"]
    );

    let loaded = QueryInputs::new()
        .filter("id", 5)
        .load(LoadSpec::new("author"));
    let found = posts.find_many(&loaded).await.unwrap();
    assert!(matches!(found[0].relation("author"), Some(Related::One(None))));
}

#[tokio::test]
async fn test_hard_delete_without_soft_deletes() {
    let posts = Repository::new(seeded_engine().await, schema(), "Post").unwrap();

    assert!(posts.delete(7).await.unwrap());
    assert!(posts.find(7).await.unwrap_err().is_not_found());
    assert!(posts.delete(7).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_file_database_persists_between_engines() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("quarry.db").display());

    let uuid = {
        let engine = SqliteEngine::connect(&url).await.unwrap();
        engine.execute_batch(FIXTURE_DDL).await.unwrap();
        engine.execute_batch(FIXTURE_DATA).await.unwrap();

        let users = Repository::new(engine, schema(), "User").unwrap();
        let created = users.create(row(json!({"name": "Gil", "role": "user"}))).await.unwrap();
        created.get_str("uuid").unwrap().to_string()
    };

    let engine = SqliteEngine::connect(&url).await.unwrap();
    let users = Repository::new(engine, schema(), "User").unwrap();
    let found = users.find(uuid.as_str()).await.unwrap();
    assert_eq!(found.get_str("name"), Some("Gil"));

    let inputs = QueryInputs::from_request(&json!({
        "filters": {"role": "user"},
        "sort": {"name": "asc"}
    }))
    .unwrap();
    assert_eq!(
        names(&users.find_many(&inputs).await.unwrap()),
        vec!["Bob", "Dee", "Gil"]
    );
}
