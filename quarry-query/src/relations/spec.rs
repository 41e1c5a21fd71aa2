//! Relation specification types.

use std::collections::HashMap;

/// Type of relation between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-many relation (e.g., User has many Posts).
    OneToMany,
    /// Many-to-one relation (e.g., Post belongs to User).
    ManyToOne,
}

impl RelationType {
    /// Check if this relation returns multiple records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany)
    }

    /// Check if this relation returns a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::ManyToOne)
    }
}

/// Specification for a relation between entities.
///
/// A parent row and a related row belong together when
/// `parent.local_key = related.foreign_key`. For a one-to-many relation the
/// local key is usually the parent's primary key; for many-to-one it is the
/// parent's foreign key column and the foreign key is the related primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Name of the relation (the key related records are attached under).
    pub name: String,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Name of the related entity in the schema.
    pub related_entity: String,
    /// Column on the parent entity.
    pub local_key: String,
    /// Column on the related entity.
    pub foreign_key: String,
}

impl RelationSpec {
    /// Create a one-to-many relation spec.
    ///
    /// `foreign_key` is the column on the related entity pointing back at the
    /// parent's `id`.
    pub fn one_to_many(
        name: impl Into<String>,
        related_entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type: RelationType::OneToMany,
            related_entity: related_entity.into(),
            local_key: "id".to_string(),
            foreign_key: foreign_key.into(),
        }
    }

    /// Create a many-to-one relation spec.
    ///
    /// `local_key` is the column on the parent holding the related `id`.
    pub fn many_to_one(
        name: impl Into<String>,
        related_entity: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type: RelationType::ManyToOne,
            related_entity: related_entity.into(),
            local_key: local_key.into(),
            foreign_key: "id".to_string(),
        }
    }

    /// Override the column on the parent entity.
    pub fn local_key(mut self, column: impl Into<String>) -> Self {
        self.local_key = column.into();
        self
    }

    /// Override the column on the related entity.
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = column.into();
        self
    }
}

/// Registry of relation specifications for an entity.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    relations: HashMap<String, RelationSpec>,
}

impl RelationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation, replacing any relation with the same name.
    pub fn register(&mut self, spec: RelationSpec) {
        self.relations.insert(spec.name.clone(), spec);
    }

    /// Get a relation by name.
    pub fn get(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    /// Get all relations.
    pub fn all(&self) -> impl Iterator<Item = &RelationSpec> {
        self.relations.values()
    }

    /// Number of registered relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check if no relation is registered.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
