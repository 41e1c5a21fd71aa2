//! Existence filters over relations.
//!
//! An existence directive keeps only parents that have (or, negated, lack)
//! a related record, optionally comparing the related record's primary key:
//!
//! ```json
//! {"relationship": "posts", "operator": "gt", "value": 10, "not": false,
//!  "load": {"relationship": "comments", "limit": 2}}
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::normalize::type_name;

use super::load::{LoadSpec, required_relation, resolve_load_map};

const DIRECTIVE: &str = "where_has";

/// Comparison applied to the related primary key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ComparisonOperator {
    /// Equal (`eq`).
    #[default]
    Eq,
    /// Greater than (`gt`).
    Gt,
    /// Less than (`lt`).
    Lt,
    /// Unrecognized operator text, compared as equality.
    Other(String),
}

impl ComparisonOperator {
    /// Parse operator text. Unknown text is kept as [`Self::Other`].
    pub fn parse(op: &str) -> Self {
        let op = op.trim();
        if op.eq_ignore_ascii_case("eq") {
            Self::Eq
        } else if op.eq_ignore_ascii_case("gt") {
            Self::Gt
        } else if op.eq_ignore_ascii_case("lt") {
            Self::Lt
        } else {
            Self::Other(op.to_string())
        }
    }

    /// The request form of the operator.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Other(op) => op,
        }
    }

    /// The SQL comparison operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq | Self::Other(_) => "=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ComparisonOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A resolved existence directive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExistenceSpec {
    /// Name of the relation that must (not) have a match.
    #[serde(rename = "relationship")]
    pub relation: String,
    /// Comparison against the related primary key.
    pub operator: ComparisonOperator,
    /// Value compared against. Without it only existence is checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
    /// Keep parents with no match instead.
    pub negate: bool,
    /// Load attached to each matching related record.
    ///
    /// The relation itself is attached holding only the records that satisfy
    /// the comparison. For a negated check that set is always empty, so every
    /// returned parent carries an empty relation even when it has other
    /// related records. When the relation is also loaded explicitly, the
    /// explicit load decides the records and this load is nested inside it.
    #[serde(rename = "load", skip_serializing_if = "Option::is_none")]
    pub nested_load: Option<LoadSpec>,
}

impl ExistenceSpec {
    /// Create a bare existence check on a relation.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            operator: ComparisonOperator::Eq,
            value: None,
            negate: false,
            nested_load: None,
        }
    }

    /// Compare the related primary key against a value.
    pub fn compare(mut self, operator: ComparisonOperator, value: impl Into<FilterValue>) -> Self {
        self.operator = operator;
        self.value = Some(value.into());
        self
    }

    /// Negate the check.
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Attach a nested load to the matching related records.
    pub fn with_load(mut self, load: LoadSpec) -> Self {
        self.nested_load = Some(load);
        self
    }

    /// Check if a key comparison applies.
    pub fn has_comparison(&self) -> bool {
        self.value.is_some()
    }
}

/// Resolve a single existence directive, filling defaults.
pub fn resolve_existence(raw: &Value) -> QueryResult<ExistenceSpec> {
    let map = raw.as_object().ok_or_else(|| {
        QueryError::invalid_input(
            DIRECTIVE,
            format!("expected an object, got {}", type_name(raw)),
        )
    })?;

    let relation = required_relation(map, DIRECTIVE)?;

    let operator = match map.get("operator") {
        None | Some(Value::Null) => ComparisonOperator::Eq,
        Some(Value::String(op)) => ComparisonOperator::parse(op),
        Some(other) => {
            return Err(QueryError::invalid_input(
                format!("{}.operator", DIRECTIVE),
                format!("expected eq, gt or lt, got {}", other),
            ));
        }
    };

    let value = match map.get("value") {
        None | Some(Value::Null) => None,
        Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
            Some(FilterValue::from_json(v))
        }
        Some(other) => {
            return Err(QueryError::invalid_input(
                format!("{}.value", DIRECTIVE),
                format!("expected a scalar, got {}", type_name(other)),
            ));
        }
    };

    let negate = map
        .get("negate")
        .or_else(|| map.get("not"))
        .map(coerce_bool)
        .unwrap_or(false);

    let nested_load = match map.get("load") {
        None | Some(Value::Null) => None,
        Some(Value::Object(load)) => Some(nested(load)?),
        Some(other) => {
            return Err(QueryError::invalid_input(
                format!("{}.load", DIRECTIVE),
                format!("expected a load directive object, got {}", type_name(other)),
            ));
        }
    };

    Ok(ExistenceSpec {
        relation,
        operator,
        value,
        negate,
        nested_load,
    })
}

/// Resolve a list of existence directives, preserving order.
///
/// Accepts an array, a single directive object, or null.
pub fn resolve_existence_list(raw: &Value) -> QueryResult<Vec<ExistenceSpec>> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(resolve_existence).collect(),
        Value::Object(_) => Ok(vec![resolve_existence(raw)?]),
        other => Err(QueryError::invalid_input(
            DIRECTIVE,
            format!("expected a list of existence directives, got {}", type_name(other)),
        )),
    }
}

fn nested(load: &Map<String, Value>) -> QueryResult<LoadSpec> {
    resolve_load_map(load, "where_has.load")
}

/// Loose truthiness for flags that arrive from query strings.
fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty()
                || s == "0"
                || s.eq_ignore_ascii_case("false")
                || s.eq_ignore_ascii_case("no")
                || s.eq_ignore_ascii_case("off"))
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_resolve_existence_with_comparison() {
        let spec =
            resolve_existence(&json!({"relationship": "posts", "operator": "gt", "value": 10}))
                .unwrap();

        assert_eq!(
            spec,
            ExistenceSpec::new("posts").compare(ComparisonOperator::Gt, 10)
        );
        assert!(!spec.negate);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"relationship": "posts", "operator": "gt", "value": 10, "negate": false})
        );
    }

    #[test]
    fn test_resolve_existence_defaults() {
        let spec = resolve_existence(&json!({"relationship": "posts"})).unwrap();
        assert_eq!(spec.operator, ComparisonOperator::Eq);
        assert!(!spec.has_comparison());
        assert!(!spec.negate);
        assert!(spec.nested_load.is_none());
    }

    #[test]
    fn test_resolve_existence_missing_relationship() {
        let err = resolve_existence(&json!({"operator": "gt", "value": 1})).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredFieldMissing);
        assert!(err.is_validation());
    }

    #[test]
    fn test_negation_coercion() {
        let cases = [
            (json!(true), true),
            (json!(1), true),
            (json!("1"), true),
            (json!("yes"), true),
            (json!(false), false),
            (json!(0), false),
            (json!("0"), false),
            (json!("false"), false),
            (json!("Off"), false),
            (json!(""), false),
            (json!(null), false),
            (json!([]), false),
            (json!([1]), true),
        ];
        for (raw, expected) in cases {
            let spec = resolve_existence(&json!({"relationship": "posts", "negate": raw.clone()}))
                .unwrap();
            assert_eq!(spec.negate, expected, "negate = {}", raw);
        }

        let spec = resolve_existence(&json!({"relationship": "posts", "not": "true"})).unwrap();
        assert!(spec.negate);
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!(ComparisonOperator::parse("GT"), ComparisonOperator::Gt);
        assert_eq!(ComparisonOperator::parse("lt").as_sql(), "<");
        let other = ComparisonOperator::parse("like");
        assert_eq!(other, ComparisonOperator::Other("like".into()));
        assert_eq!(other.as_sql(), "=");
        assert_eq!(other.to_string(), "like");
    }

    #[test]
    fn test_value_must_be_scalar() {
        let err = resolve_existence(&json!({"relationship": "posts", "value": [1, 2]})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);

        let spec = resolve_existence(&json!({"relationship": "posts", "value": null})).unwrap();
        assert!(!spec.has_comparison());
    }

    #[test]
    fn test_nested_load() {
        let spec = resolve_existence(&json!({
            "relationship": "posts",
            "load": {"relationship": "comments", "limit": 2}
        }))
        .unwrap();
        assert_eq!(spec.nested_load, Some(LoadSpec::new("comments").limit(2)));
    }

    #[test]
    fn test_nested_load_depth_is_one() {
        let err = resolve_existence(&json!({
            "relationship": "posts",
            "load": {"relationship": "comments", "load": {"relationship": "author"}}
        }))
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedNesting);

        let err = resolve_existence(&json!({"relationship": "posts", "load": {}})).unwrap_err();
        assert_eq!(err.message, "where_has.load must have 'relationship' key");
    }

    #[test]
    fn test_resolve_existence_list() {
        let specs = resolve_existence_list(&json!([
            {"relationship": "posts", "not": true},
            {"relationship": "role"}
        ]))
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs[0].negate);
        assert_eq!(specs[1].relation, "role");

        assert!(resolve_existence_list(&json!(null)).unwrap().is_empty());
        assert!(resolve_existence_list(&json!(true)).is_err());
    }
}
