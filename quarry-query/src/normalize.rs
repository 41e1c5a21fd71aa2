//! Request normalization.
//!
//! Request fragments arrive loosely typed: a field selection may be a
//! comma-separated string or an array, filters a flat object, sort an
//! object of field to direction. The functions here turn them into the
//! canonical [`FieldList`], [`FilterMap`] and [`SortSpec`] structures the
//! compiler consumes.

use serde_json::Value;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::types::{FieldList, FilterMap, SortOrder, SortSpec};

/// Normalize a field list or group-by list.
///
/// A string is split on commas with every segment trimmed; an array passes
/// through. Anything else, or a list with nothing in it, is absent.
///
/// ```rust
/// use quarry_query::normalize::normalize_list;
/// use serde_json::json;
///
/// let fields = normalize_list(Some(&json!("id, name ,email")));
/// assert_eq!(fields, Some(vec!["id".into(), "name".into(), "email".into()]));
/// assert_eq!(normalize_list(Some(&json!([]))), None);
/// assert_eq!(normalize_list(None), None);
/// ```
pub fn normalize_list(input: Option<&Value>) -> Option<FieldList> {
    let list: FieldList = match input? {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        _ => return None,
    };

    if list.is_empty() { None } else { Some(list) }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build a [`FilterMap`] from a flat request object.
///
/// Absent or null input yields an empty map.
pub fn normalize_filters(raw: &Value) -> QueryResult<FilterMap> {
    match raw {
        Value::Null => Ok(FilterMap::new()),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(field, value)| (field.clone(), FilterValue::from_json(value)))
            .collect()),
        other => Err(QueryError::invalid_filter(
            "filters",
            format!("expected an object of field to value, got {}", type_name(other)),
        )),
    }
}

/// Build a [`SortSpec`] from a request object, keeping key order.
pub fn normalize_sort(raw: &Value) -> QueryResult<SortSpec> {
    let map = match raw {
        Value::Null => return Ok(SortSpec::new()),
        Value::Object(map) => map,
        other => {
            return Err(QueryError::invalid_filter(
                "sort",
                format!("expected an object of field to direction, got {}", type_name(other)),
            ));
        }
    };

    let mut sort = SortSpec::with_capacity(map.len());
    for (field, direction) in map {
        let order = direction
            .as_str()
            .and_then(SortOrder::parse)
            .ok_or_else(|| {
                QueryError::invalid_filter(
                    format!("sort.{}", field),
                    format!("direction must be ASC or DESC, got {}", direction),
                )
            })?;
        sort.insert(field.clone(), order);
    }
    Ok(sort)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
