//! Common types used in query building.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::FilterValue;

/// Ordered field names; `None` at use sites means "all fields".
pub type FieldList = Vec<String>;

/// Ordered grouping keys.
pub type GroupKeys = Vec<String>;

/// Field to equality value. All entries are ANDed together.
pub type FilterMap = IndexMap<String, FilterValue>;

/// Field to sort direction. Iteration order is ORDER BY order.
pub type SortSpec = IndexMap<String, SortOrder>;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse a direction, ignoring case and surrounding whitespace.
    pub fn parse(direction: &str) -> Option<Self> {
        let direction = direction.trim();
        if direction.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if direction.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Order by specification for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column name to order by.
    pub column: String,
    /// The sort order.
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Desc)
    }
}
