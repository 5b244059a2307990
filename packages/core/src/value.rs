//! The Value type - a tree-shaped data structure.
//!
//! Everything stored in the namespace is a `Value`: numbers, strings,
//! nested records. The type maps directly to JSON, which is what the disk
//! handlers persist.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

/// A tree-shaped value attached to a virtual path.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic ordering (important for comparison
///   and stable serialization)
/// - Uses `i64` for integers; floats are kept separate so timestamps and
///   coordinates do not lose precision through a common numeric type
/// - `Null` doubles as the "absent" sentinel: passing it to `set` removes
///   the path
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get a child value by key, for maps.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// The numeric content of this value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// The string content of this value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Build the minimal nested document in which the tree rooted at
    /// `segments` equals `value`.
    ///
    /// Used to validate a single-path write against a whole-namespace
    /// schema: `nest(["a", "b"], v)` is `{"a": {"b": v}}`.
    pub fn nest<S: AsRef<str>>(segments: &[S], value: Value) -> Value {
        let mut doc = value;
        for seg in segments.iter().rev() {
            let mut map = BTreeMap::new();
            map.insert(seg.as_ref().to_string(), doc);
            doc = Value::Map(map);
        }
        doc
    }

    /// Convert to a `serde_json` value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Integer(n) => JsonValue::from(*n),
            Value::Float(n) => {
                // JSON has no NaN/Infinity; fold them to null like
                // serde_json's own lossy conversions do.
                serde_json::Number::from_f64(*n)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(arr) => JsonValue::Array(arr.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Build from a `serde_json` value.
    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(arr) => Value::Array(arr.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
