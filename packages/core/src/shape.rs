//! Composable shape validators.
//!
//! A [`Shape`] describes what values a part of the namespace accepts:
//! numeric ranges, string patterns, lists, dictionaries with fixed keys,
//! and open key/value maps. Validation returns the full list of
//! [`Violation`]s with a breadcrumb to the offending spot, so a rejected
//! write can be diagnosed from the error alone.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::Value;

/// One reason a value failed validation, with the breadcrumb of map keys
/// and list indexes leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Breadcrumb like `.abc.profile.name` or `[2]`; empty at the root.
    pub at: String,
    /// What was expected.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.at.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} at input{}", self.message, self.at)
        }
    }
}

/// A composable validator over [`Value`] trees.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Accepts any value.
    Anything,
    /// A number in a closed range.
    Number { min: f64, max: f64 },
    /// A string matching a pattern, with length bounds.
    Text {
        pattern: Regex,
        min_len: usize,
        max_len: Option<usize>,
    },
    /// An array whose items all match one shape.
    List(Box<Shape>),
    /// A map with a fixed key set; keys are required unless wrapped in
    /// [`Shape::Opt`], and unknown keys are ignored.
    Dict(BTreeMap<String, Shape>),
    /// A map that allows only the listed keys, each optional.
    Subset(BTreeMap<String, Shape>),
    /// An open map: every key must match `key`, every value `val`.
    KeyVal { key: Box<Shape>, val: Box<Shape> },
    /// Inside a [`Shape::Dict`]: the key may be missing.
    Opt(Box<Shape>),
    /// The value may be null.
    NullOr(Box<Shape>),
}

impl Shape {
    /// A number in `min..=max`.
    pub fn number(min: f64, max: f64) -> Shape {
        assert!(min < max, "bad range: {}..{}", min, max);
        Shape::Number { min, max }
    }

    /// A string matching `pattern` (anchor it yourself).
    pub fn text(pattern: &str) -> Shape {
        Shape::Text {
            pattern: Regex::new(pattern).expect("invalid shape pattern"),
            min_len: 0,
            max_len: None,
        }
    }

    /// A string matching `pattern` with explicit length bounds.
    pub fn text_sized(pattern: &str, min_len: usize, max_len: usize) -> Shape {
        Shape::Text {
            pattern: Regex::new(pattern).expect("invalid shape pattern"),
            min_len,
            max_len: Some(max_len),
        }
    }

    /// A lowercase hex string of exactly `digits` digits.
    pub fn hex(digits: usize) -> Shape {
        Shape::text_sized("^[0-9a-f]*$", digits, digits)
    }

    /// Printable ASCII between `min_len` and `max_len` chars.
    pub fn ascii(min_len: usize, max_len: usize) -> Shape {
        Shape::text_sized("^[\\x20-\\x7e]*$", min_len, max_len)
    }

    /// A dict shape from (key, shape) pairs.
    pub fn dict<const N: usize>(fields: [(&str, Shape); N]) -> Shape {
        Shape::Dict(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// A subset shape from (key, shape) pairs.
    pub fn subset<const N: usize>(fields: [(&str, Shape); N]) -> Shape {
        Shape::Subset(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// An open map shape.
    pub fn keyval(key: Shape, val: Shape) -> Shape {
        Shape::KeyVal {
            key: Box::new(key),
            val: Box::new(val),
        }
    }

    /// Wrap a dict field as optional.
    pub fn opt(inner: Shape) -> Shape {
        Shape::Opt(Box::new(inner))
    }

    /// Allow null in place of the inner shape.
    pub fn null_or(inner: Shape) -> Shape {
        Shape::NullOr(Box::new(inner))
    }

    /// Validate `input`, returning every violation found.
    pub fn validate(&self, input: &Value) -> Vec<Violation> {
        let mut out = Vec::new();
        self.validate_into(input, String::new(), &mut out);
        out
    }

    /// True if `input` has no violations.
    pub fn test(&self, input: &Value) -> bool {
        self.validate(input).is_empty()
    }

    fn push(out: &mut Vec<Violation>, at: &str, message: impl Into<String>) {
        out.push(Violation {
            at: at.to_string(),
            message: message.into(),
        });
    }

    fn validate_into(&self, input: &Value, at: String, out: &mut Vec<Violation>) {
        match self {
            Shape::Anything => {}

            Shape::Number { min, max } => match input.as_f64() {
                Some(n) if (*min..=*max).contains(&n) => {}
                Some(_) => Self::push(out, &at, format!("not in the {}..{} range", min, max)),
                None => Self::push(out, &at, "number expected"),
            },

            Shape::Text {
                pattern,
                min_len,
                max_len,
            } => match input.as_str() {
                None => Self::push(out, &at, "string expected"),
                Some(s) if s.len() < *min_len => {
                    Self::push(out, &at, format!("shorter than {} chars", min_len))
                }
                Some(s) if max_len.is_some_and(|max| s.len() > max) => {
                    Self::push(out, &at, format!("longer than {} chars", max_len.unwrap()))
                }
                Some(s) if !pattern.is_match(s) => {
                    Self::push(out, &at, format!("doesn't match {}", pattern))
                }
                Some(_) => {}
            },

            Shape::List(item) => match input {
                Value::Array(arr) => {
                    for (i, v) in arr.iter().enumerate() {
                        item.validate_into(v, format!("{}[{}]", at, i), out);
                    }
                }
                _ => Self::push(out, &at, "array expected"),
            },

            Shape::Dict(fields) => match input {
                Value::Map(map) => {
                    for (key, shape) in fields {
                        match (map.get(key), shape) {
                            (None, Shape::Opt(_)) => {}
                            (None, _) => {
                                Self::push(out, &at, format!("missing key {:?}", key))
                            }
                            (Some(v), _) => {
                                shape.validate_into(v, format!("{}.{}", at, key), out)
                            }
                        }
                    }
                }
                _ => Self::push(out, &at, "dictionary expected"),
            },

            Shape::Subset(fields) => match input {
                Value::Map(map) => {
                    for (key, v) in map {
                        match fields.get(key) {
                            Some(shape) => {
                                shape.validate_into(v, format!("{}.{}", at, key), out)
                            }
                            None => Self::push(out, &at, format!("unexpected key {:?}", key)),
                        }
                    }
                }
                _ => Self::push(out, &at, "dictionary expected"),
            },

            Shape::KeyVal { key, val } => match input {
                Value::Map(map) => {
                    for (k, v) in map {
                        let key_value = Value::String(k.clone());
                        key.validate_into(&key_value, format!("{}.{}", at, k), out);
                        val.validate_into(v, format!("{}.{}", at, k), out);
                    }
                }
                _ => Self::push(out, &at, "dictionary expected"),
            },

            Shape::Opt(inner) => {
                // A present value must still match; absence is handled by
                // the enclosing Dict.
                inner.validate_into(input, at, out);
            }

            Shape::NullOr(inner) => {
                if !input.is_null() {
                    inner.validate_into(input, at, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(v: serde_json::Value) -> Value {
        Value::from_json(&v)
    }

    #[test]
    fn number_range() {
        let lat = Shape::number(-90.0, 90.0);
        assert!(lat.test(&Value::Float(51.5073)));
        assert!(lat.test(&Value::Integer(-90)));
        assert!(!lat.test(&Value::Float(90.1)));
        assert!(!lat.test(&Value::from("51")));
    }

    #[test]
    fn text_pattern_and_length() {
        let uid = Shape::hex(16);
        assert!(uid.test(&Value::from("0123456789abcdef")));
        assert!(!uid.test(&Value::from("0123456789ABCDEF")));
        assert!(!uid.test(&Value::from("0123")));

        let short = Shape::ascii(0, 4);
        assert!(short.test(&Value::from("abcd")));
        assert!(!short.test(&Value::from("abcde")));
        assert!(!short.test(&Value::from("\u{1F600}")));
    }

    #[test]
    fn list_reports_index() {
        let shape = Shape::List(Box::new(Shape::hex(2)));
        let violations = shape.validate(&json(serde_json::json!(["ab", "xyz"])));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].at, "[1]");
    }

    #[test]
    fn dict_requires_keys_unless_opt() {
        let shape = Shape::dict([
            ("text", Shape::ascii(0, 100)),
            ("mood", Shape::opt(Shape::ascii(0, 10))),
        ]);
        assert!(shape.test(&json(serde_json::json!({"text": "hi"}))));
        assert!(!shape.test(&json(serde_json::json!({"mood": "ok"}))));
        assert!(!shape.test(&json(serde_json::json!({"text": "hi", "mood": 5}))));
    }

    #[test]
    fn subset_rejects_unknown_keys() {
        let shape = Shape::subset([("lat", Shape::number(-90.0, 90.0))]);
        assert!(shape.test(&json(serde_json::json!({"lat": 1.0}))));
        assert!(shape.test(&json(serde_json::json!({}))));
        assert!(!shape.test(&json(serde_json::json!({"alt": 1.0}))));
    }

    #[test]
    fn keyval_checks_keys_and_values() {
        let shape = Shape::keyval(Shape::hex(16), Shape::hex(8));
        assert!(shape.test(&json(serde_json::json!({
            "0123456789abcdef": "0abc0abc"
        }))));
        assert!(!shape.test(&json(serde_json::json!({"bad key": "0abc0abc"}))));
        assert!(!shape.test(&json(serde_json::json!({"0123456789abcdef": "nope"}))));
    }

    #[test]
    fn null_or_admits_null() {
        let shape = Shape::null_or(Shape::hex(4));
        assert!(shape.test(&Value::Null));
        assert!(shape.test(&Value::from("0ab1")));
        assert!(!shape.test(&Value::from("zz")));
    }

    #[test]
    fn violation_breadcrumbs_are_nested() {
        let shape = Shape::subset([(
            "places",
            Shape::keyval(
                Shape::hex(8),
                Shape::subset([("lat", Shape::number(-90.0, 90.0))]),
            ),
        )]);
        let violations = shape.validate(&json(serde_json::json!({
            "places": {"00f2bc17": {"lat": 200.0}}
        })));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].at, ".places.00f2bc17.lat");
        assert!(violations[0].to_string().contains("range"));
    }

    #[test]
    fn anything_accepts_everything() {
        assert!(Shape::Anything.test(&Value::Null));
        assert!(Shape::Anything.test(&json(serde_json::json!({"a": [1, 2]}))));
    }
}
