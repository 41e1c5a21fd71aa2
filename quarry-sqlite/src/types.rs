//! Type conversion utilities for SQLite.

use rusqlite::types::{Value, ValueRef};
use serde_json::Value as JsonValue;

use quarry_query::filter::FilterValue;
use quarry_query::traits::Row;

/// Convert a FilterValue to a SQLite Value.
pub fn filter_value_to_sqlite(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
        FilterValue::Json(j) => Value::Text(j.to_string()),
    }
}

/// Convert a SQLite ValueRef to a JSON Value.
///
/// Text that looks like a JSON object or array is decoded, so structured
/// values written through [`FilterValue::Json`] read back as structure.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => {
            let s = String::from_utf8_lossy(bytes).into_owned();
            if s.starts_with('{') || s.starts_with('[') {
                serde_json::from_str(&s).unwrap_or(JsonValue::String(s))
            } else {
                JsonValue::String(s)
            }
        }
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        },
    }
}

/// Get a JSON value from a row at the given column index.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> JsonValue {
    row.get_ref(index)
        .map(from_sqlite_value)
        .unwrap_or(JsonValue::Null)
}

/// Read a whole row into a column-ordered map.
pub(crate) fn row_to_map(row: &rusqlite::Row<'_>, columns: &[String]) -> Row {
    let mut map = Row::new();
    for (i, col) in columns.iter().enumerate() {
        map.insert(col.clone(), get_value_at_index(row, i));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_value_to_sqlite_null() {
        let result = filter_value_to_sqlite(&FilterValue::Null);
        assert!(matches!(result, Value::Null));
    }

    #[test]
    fn test_filter_value_to_sqlite_bool() {
        let result = filter_value_to_sqlite(&FilterValue::Bool(true));
        assert!(matches!(result, Value::Integer(1)));

        let result = filter_value_to_sqlite(&FilterValue::Bool(false));
        assert!(matches!(result, Value::Integer(0)));
    }

    #[test]
    fn test_filter_value_to_sqlite_scalars() {
        assert!(matches!(filter_value_to_sqlite(&FilterValue::Int(42)), Value::Integer(42)));
        assert!(matches!(
            filter_value_to_sqlite(&FilterValue::String("hello".to_string())),
            Value::Text(s) if s == "hello"
        ));
        match filter_value_to_sqlite(&FilterValue::Float(2.5)) {
            Value::Real(f) => assert!((f - 2.5).abs() < f64::EPSILON),
            other => panic!("Expected Real, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_value_to_sqlite_json() {
        let result = filter_value_to_sqlite(&FilterValue::Json(serde_json::json!({"a": 1})));
        assert!(matches!(result, Value::Text(s) if s == r#"{"a":1}"#));
    }

    #[test]
    fn test_from_sqlite_value_scalars() {
        assert_eq!(from_sqlite_value(ValueRef::Null), JsonValue::Null);
        assert_eq!(from_sqlite_value(ValueRef::Integer(42)), JsonValue::from(42));
        assert_eq!(from_sqlite_value(ValueRef::Real(2.5)), JsonValue::from(2.5));
        assert_eq!(
            from_sqlite_value(ValueRef::Text(b"hello")),
            JsonValue::String("hello".to_string())
        );
    }

    #[test]
    fn test_from_sqlite_value_json_text() {
        let result = from_sqlite_value(ValueRef::Text(b"{\"key\": \"value\"}"));
        assert_eq!(result, serde_json::json!({"key": "value"}));

        let result = from_sqlite_value(ValueRef::Text(b"[not json"));
        assert_eq!(result, JsonValue::String("[not json".to_string()));
    }

    #[test]
    fn test_from_sqlite_value_blob() {
        assert_eq!(from_sqlite_value(ValueRef::Blob(b"abc")), JsonValue::from("abc"));
        assert_eq!(
            from_sqlite_value(ValueRef::Blob(&[0xff, 0x00])),
            serde_json::json!([255, 0])
        );
    }
}
