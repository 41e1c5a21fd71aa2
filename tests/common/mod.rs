//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use quarry::prelude::*;
use serde_json::Value;

pub const FIXTURE_DDL: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        role TEXT,
        created_at TEXT,
        updated_at TEXT,
        deleted_at TEXT
    );
    CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT);
    CREATE TABLE comments (id INTEGER PRIMARY KEY, post_id INTEGER, body TEXT);
    CREATE TABLE roles (id INTEGER PRIMARY KEY, user_id INTEGER, name TEXT);
";

pub const FIXTURE_DATA: &str = "
    INSERT INTO users (id, uuid, name, role) VALUES
        (1, 'u-ada', 'Ada', 'admin'),
        (2, 'u-bob', 'Bob', 'user'),
        (3, 'u-cy', 'Cy', 'admin'),
        (4, 'u-dee', 'Dee', 'user');
    INSERT INTO posts (id, user_id, title) VALUES
        (1, 1, 'p1'), (2, 1, 'p2'), (3, 1, 'p3'), (4, 1, 'p4'),
        (5, 2, 'p5'), (6, 2, 'p6'),
        (7, 3, 'p7');
    INSERT INTO comments (id, post_id, body) VALUES
        (1, 1, 'c1'), (2, 1, 'c2'), (3, 6, 'c3'), (4, 7, 'c4'), (5, 7, 'c5');
    INSERT INTO roles (id, user_id, name) VALUES
        (1, 1, 'owner'), (2, 1, 'editor'), (3, 2, 'viewer');
";

/// Users, posts, comments and roles.
pub fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new()
            .entity(
                EntitySchema::new("User", "users")
                    .uuid_column("uuid")
                    .soft_deletes()
                    .timestamps()
                    .relation(RelationSpec::one_to_many("posts", "Post", "user_id"))
                    .relation(RelationSpec::one_to_many("roles", "Role", "user_id")),
            )
            .entity(
                EntitySchema::new("Post", "posts")
                    .relation(RelationSpec::one_to_many("comments", "Comment", "post_id"))
                    .relation(RelationSpec::many_to_one("author", "User", "user_id")),
            )
            .entity(EntitySchema::new("Comment", "comments"))
            .entity(EntitySchema::new("Role", "roles")),
    )
}

/// A fresh in-memory database with the fixture tables.
pub async fn empty_engine() -> SqliteEngine {
    let engine = SqliteEngine::connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    engine
        .execute_batch(FIXTURE_DDL)
        .await
        .expect("create fixture tables");
    engine
}

/// A fresh in-memory database with the fixture tables and rows.
pub async fn seeded_engine() -> SqliteEngine {
    let engine = empty_engine().await;
    engine
        .execute_batch(FIXTURE_DATA)
        .await
        .expect("seed fixture rows");
    engine
}

pub async fn users() -> Repository<SqliteEngine> {
    Repository::new(seeded_engine().await, schema(), "User").expect("User entity")
}

/// Build a data map from a JSON object literal.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

pub fn names(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(|r| r.get_str("name")).collect()
}

pub fn titles(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(|r| r.get_str("title")).collect()
}
