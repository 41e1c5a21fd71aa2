//! Entity schema supplied by the caller.
//!
//! The compiler never guesses table or key names: each entity a request can
//! target, and each relation it can load or filter on, is declared here.
//!
//! ```rust
//! use quarry_query::schema::{EntitySchema, KeyType, Schema};
//! use quarry_query::relations::RelationSpec;
//!
//! let schema = Schema::new()
//!     .entity(
//!         EntitySchema::new("User", "users")
//!             .uuid_column("uuid")
//!             .soft_deletes()
//!             .relation(RelationSpec::one_to_many("posts", "Post", "user_id")),
//!     )
//!     .entity(EntitySchema::new("Post", "posts").key_type(KeyType::Integer));
//!
//! assert_eq!(schema.get("User").unwrap().identifier(), "uuid");
//! ```

use std::collections::HashMap;

use crate::error::{QueryError, QueryResult};
use crate::relations::{RelationRegistry, RelationSpec};

/// Column set when a soft-deletable record is deleted.
pub const DELETED_AT: &str = "deleted_at";
/// Column set when a record is created.
pub const CREATED_AT: &str = "created_at";
/// Column refreshed when a record is updated.
pub const UPDATED_AT: &str = "updated_at";

/// How primary key values are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyType {
    /// Assigned by the data store.
    #[default]
    Integer,
    /// Generated as a v4 UUID string before insert.
    Uuid,
}

/// Description of one entity.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    /// Entity name used in requests and relation targets.
    pub name: String,
    /// Backing table.
    pub table: String,
    /// Primary key column.
    pub primary_key: String,
    /// How the primary key is produced.
    pub key_type: KeyType,
    /// Separate UUID identifier column, if any.
    pub uuid_column: Option<String>,
    /// Rows are marked with `deleted_at` instead of being removed.
    pub soft_deletes: bool,
    /// Rows carry `created_at`/`updated_at`.
    pub timestamps: bool,
    relations: RelationRegistry,
}

impl EntitySchema {
    /// Create an entity with an integer `id` primary key.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            key_type: KeyType::Integer,
            uuid_column: None,
            soft_deletes: false,
            timestamps: false,
            relations: RelationRegistry::new(),
        }
    }

    /// Set the primary key column.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Set how the primary key is produced.
    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Use a separate UUID column as the record identifier.
    pub fn uuid_column(mut self, column: impl Into<String>) -> Self {
        self.uuid_column = Some(column.into());
        self
    }

    /// Enable soft deletes.
    pub fn soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    /// Enable timestamps.
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Declare a relation.
    pub fn relation(mut self, spec: RelationSpec) -> Self {
        self.relations.register(spec);
        self
    }

    /// The column records are looked up by.
    pub fn identifier(&self) -> &str {
        self.uuid_column.as_deref().unwrap_or(&self.primary_key)
    }

    /// Columns that receive a generated UUID when empty on create.
    pub fn generated_uuid_columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        if self.key_type == KeyType::Uuid {
            columns.push(self.primary_key.as_str());
        }
        if let Some(ref column) = self.uuid_column {
            if !columns.contains(&column.as_str()) {
                columns.push(column.as_str());
            }
        }
        columns
    }

    /// Look up a relation.
    pub fn get_relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    /// Look up a relation or fail with a validation error.
    pub fn relation_or_err(&self, name: &str) -> QueryResult<&RelationSpec> {
        self.get_relation(name)
            .ok_or_else(|| QueryError::unknown_relation(&self.name, name))
    }

    /// All declared relations.
    pub fn relations(&self) -> &RelationRegistry {
        &self.relations
    }
}

/// Catalog of entities keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<String, EntitySchema>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity.
    pub fn entity(mut self, entity: EntitySchema) -> Self {
        self.register(entity);
        self
    }

    /// Add an entity in place.
    pub fn register(&mut self, entity: EntitySchema) {
        self.entities.insert(entity.name.clone(), entity);
    }

    /// Look up an entity.
    pub fn get(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }

    /// Look up an entity or fail with a validation error.
    pub fn entity_or_err(&self, name: &str) -> QueryResult<&EntitySchema> {
        self.get(name).ok_or_else(|| QueryError::unknown_entity(name))
    }

    /// Resolve a relation of an entity together with the related entity.
    pub fn resolve_relation<'a>(
        &'a self,
        entity: &'a EntitySchema,
        relation: &str,
    ) -> QueryResult<(&'a RelationSpec, &'a EntitySchema)> {
        let spec = entity.relation_or_err(relation)?;
        let related = self.get(&spec.related_entity).ok_or_else(|| {
            QueryError::unknown_entity(&spec.related_entity)
                .with_context(format!("resolving relation {}.{}", entity.name, relation))
        })?;
        Ok((spec, related))
    }
}
