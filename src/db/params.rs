//! Parameter values and the insertion-ordered parameter map.
//!
//! Callers supply parameters as a named map, but only the *values* are bound,
//! positionally, in the order the entries were inserted. Names exist for
//! call-site readability and to compute the placeholder count; they are never
//! turned into named placeholders. Values must therefore be inserted in the
//! order the target statement expects them.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::types::Json;

/// A scalar value bindable as a statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// JSON value
    Json(JsonValue),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Insertion-ordered mapping from parameter name to value.
///
/// Re-inserting an existing key replaces the value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(String, SqlValue)>,
}

impl ParamMap {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, keeping insertion order for new keys.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a parameter by name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Number of parameters; equals the synthesized placeholder count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values in insertion order - the positional bind arguments.
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Parameter names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Build a [`ParamMap`] from literal entries, in written order.
///
/// ```
/// use pg_gateway::params;
///
/// let map = params! { "user_id" => 1, "glucose_value" => 120 };
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::db::params::ParamMap::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::db::params::ParamMap::new();
        $(map.insert($name, $value);)+
        map
    }};
}

/// Bind a value to a PostgreSQL query.
pub(crate) fn bind_value<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &'q SqlValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Json(v) => query.bind(Json(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_follow_insertion_order() {
        let mut map = ParamMap::new();
        map.insert("zebra", 1);
        map.insert("apple", 2);
        map.insert("mango", 3);

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["zebra", "apple", "mango"]);

        let values: Vec<&SqlValue> = map.values().collect();
        assert_eq!(
            values,
            vec![&SqlValue::Int(1), &SqlValue::Int(2), &SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_same_keys_different_order_bind_differently() {
        let ab: ParamMap = [("a", 1), ("b", 2)].into_iter().collect();
        let ba: ParamMap = [("b", 2), ("a", 1)].into_iter().collect();

        let ab_values: Vec<&SqlValue> = ab.values().collect();
        let ba_values: Vec<&SqlValue> = ba.values().collect();
        assert_ne!(ab_values, ba_values);
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut map = ParamMap::new();
        map.insert("first", 1);
        map.insert("second", 2);
        map.insert("first", 10);

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["first", "second"]);
        assert_eq!(map.get("first"), Some(&SqlValue::Int(10)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_params_macro() {
        let map = params! { "user_id" => 1, "name" => "Alice", "active" => true };
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("name"), Some(&SqlValue::Text("Alice".to_string())));

        let empty = params! {};
        assert!(empty.is_empty());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(5i64)), SqlValue::Int(5));
        assert_eq!(SqlValue::from(1.5), SqlValue::Float(1.5));
        assert!(SqlValue::Null.is_null());
        assert_eq!(SqlValue::Bytes(vec![1, 2]).type_name(), "bytes");
    }

    #[test]
    fn test_untagged_deserialization() {
        let value: SqlValue = serde_json::from_str("120").unwrap();
        assert_eq!(value, SqlValue::Int(120));
        let value: SqlValue = serde_json::from_str("\"after breakfast\"").unwrap();
        assert_eq!(value, SqlValue::Text("after breakfast".to_string()));
        let value: SqlValue = serde_json::from_str("null").unwrap();
        assert!(value.is_null());
    }
}
