//! Materialized query results.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::traits::Row;

/// Related records attached to a parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Related {
    /// One-to-many: every loaded child, in load order.
    Many(Vec<Record>),
    /// Many-to-one: the parent's target, if it exists and is visible.
    One(Option<Box<Record>>),
}

impl Related {
    /// Number of attached records.
    pub fn len(&self) -> usize {
        match self {
            Self::Many(records) => records.len(),
            Self::One(record) => usize::from(record.is_some()),
        }
    }

    /// Check if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attached records as a slice-like iterator.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        let (many, one) = match self {
            Self::Many(records) => (records.as_slice(), None),
            Self::One(record) => (&[][..], record.as_deref()),
        };
        many.iter().chain(one)
    }
}

/// One entity row with its loaded relations.
///
/// Serializes to a single flat object: columns first, then each relation
/// under its name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    /// Column values.
    #[serde(flatten)]
    pub fields: Row,
    /// Loaded relations by name.
    #[serde(flatten)]
    pub relations: IndexMap<String, Related>,
}

impl Record {
    /// Wrap a fetched row.
    pub fn new(fields: Row) -> Self {
        Self {
            fields,
            relations: IndexMap::new(),
        }
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Get a column value as a string slice.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Get a column value as an integer.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Get a loaded relation.
    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// Loaded one-to-many records, empty if the relation was not loaded.
    pub fn many(&self, name: &str) -> &[Record] {
        match self.relations.get(name) {
            Some(Related::Many(records)) => records,
            _ => &[],
        }
    }

    /// Loaded many-to-one record.
    pub fn one(&self, name: &str) -> Option<&Record> {
        match self.relations.get(name) {
            Some(Related::One(record)) => record.as_deref(),
            _ => None,
        }
    }

    /// Convert into one JSON object.
    pub fn into_json(self) -> Value {
        let mut object = self.fields;
        for (name, related) in self.relations {
            let value = match related {
                Related::Many(records) => {
                    Value::Array(records.into_iter().map(Record::into_json).collect())
                }
                Related::One(Some(record)) => record.into_json(),
                Related::One(None) => Value::Null,
            };
            object.insert(name, value);
        }
        Value::Object(object)
    }
}

impl From<Row> for Record {
    fn from(fields: Row) -> Self {
        Self::new(fields)
    }
}
