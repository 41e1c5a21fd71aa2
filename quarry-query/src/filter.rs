//! Filter types for building WHERE clauses.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A filter value that can be used in comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value, compared against its serialized text.
    Json(JsonValue),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is a scalar (anything but a JSON document).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Json(_))
    }

    /// Convert an untyped request value.
    ///
    /// Integral numbers become `Int`, other numbers `Float`; arrays and
    /// objects are kept as `Json`.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Self::String(s.clone()),
            other => Self::Json(other.clone()),
        }
    }

    /// Convert back into a JSON value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Json(j) => j.clone(),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<&String> for FilterValue {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl From<JsonValue> for FilterValue {
    fn from(v: JsonValue) -> Self {
        Self::from_json(&v)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A column predicate.
///
/// Columns are bare names; the SQL renderer qualifies them with the table
/// or alias the predicate is applied to.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// No filter (always true).
    None,
    /// Equals comparison.
    Equals(String, FilterValue),
    /// Less than comparison.
    Lt(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Is null check.
    IsNull(String),
    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter, dropping empty members.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(FilterValue::from_json(&json!(null)), FilterValue::Null);
        assert_eq!(FilterValue::from_json(&json!(true)), FilterValue::Bool(true));
        assert_eq!(FilterValue::from_json(&json!(10)), FilterValue::Int(10));
        assert_eq!(FilterValue::from_json(&json!(2.5)), FilterValue::Float(2.5));
        assert_eq!(
            FilterValue::from_json(&json!("admin")),
            FilterValue::String("admin".into())
        );
    }

    #[test]
    fn test_from_json_documents() {
        let value = FilterValue::from_json(&json!({"a": 1}));
        assert!(!value.is_scalar());
        assert_eq!(value.to_json(), json!({"a": 1}));
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<i64> = None;
        assert!(FilterValue::from(none).is_null());
        assert_eq!(FilterValue::from(Some(3i64)), FilterValue::Int(3));
    }

    #[test]
    fn test_and_drops_empty() {
        assert!(Filter::and([Filter::None, Filter::None]).is_none());

        let single = Filter::and([Filter::None, Filter::IsNull("deleted_at".into())]);
        assert_eq!(single, Filter::IsNull("deleted_at".into()));

        let both = Filter::and([
            Filter::Equals("role".into(), "admin".into()),
            Filter::Gt("id".into(), 5.into()),
        ]);
        assert!(matches!(both, Filter::And(ref v) if v.len() == 2));
    }

    #[test]
    fn test_and_then_flattens() {
        let filter = Filter::Equals("a".into(), 1.into())
            .and_then(Filter::Equals("b".into(), 2.into()))
            .and_then(Filter::Equals("c".into(), 3.into()));
        assert!(matches!(filter, Filter::And(ref v) if v.len() == 3));
        assert!(Filter::not(Filter::None).is_none());
    }
}
