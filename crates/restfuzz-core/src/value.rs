//! Sampled values.
//!
//! [`Value`] is the output of every sampler. It mirrors JSON but keeps
//! non-finite floats, which `serde_json::Value` cannot hold. When serialized,
//! NaN and the infinities are written as the strings `"NaN"`, `"Infinity"` and
//! `"-Infinity"`.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, Serializer};

/// A structured value produced by sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual form used for path, query, header and form values.
    ///
    /// Strings are rendered raw, arrays comma-joined, objects as JSON.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => render_float(*f),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::render)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => self.to_string(),
        }
    }

    /// Convert a JSON value, e.g. an enum entry from the API description.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Nesting depth: scalars are 0, each array/object level adds one.
    pub fn depth(&self) -> usize {
        match self {
            Value::Array(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Object(map) => 1 + map.values().map(Value::depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() && f > 0.0 {
        "Infinity".to_string()
    } else if f.is_infinite() {
        "-Infinity".to_string()
    } else {
        f.to_string()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(f) => serializer.serialize_str(&render_float(*f)),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
        }
    }
}

/// JSON text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        assert_eq!(Value::from("abc").render(), "abc");
        assert_eq!(Value::from(-42).render(), "-42");
        assert_eq!(Value::from(true).render(), "true");
        assert_eq!(Value::Float(f64::NAN).render(), "NaN");
        assert_eq!(Value::Float(f64::NEG_INFINITY).render(), "-Infinity");
        assert_eq!(
            Value::Array(vec![Value::from(1), Value::from("x")]).render(),
            "1,x"
        );
    }

    #[test]
    fn test_non_finite_json() {
        let value = Value::Array(vec![
            Value::Float(f64::INFINITY),
            Value::Float(1.5),
            Value::Null,
        ]);
        assert_eq!(value.to_string(), r#"["Infinity",1.5,null]"#);
    }

    #[test]
    fn test_object_json_is_key_ordered() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), Value::from(2));
        map.insert("a".to_string(), Value::from("x"));
        assert_eq!(Value::Object(map).to_string(), r#"{"a":"x","b":2}"#);
    }

    #[test]
    fn test_from_json() {
        let value = Value::from_json(&json!({"n": 3, "f": 0.5, "list": [true, null]}));
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map["n"], Value::Int(3));
        assert_eq!(map["f"], Value::Float(0.5));
        assert_eq!(map["list"], Value::Array(vec![Value::Bool(true), Value::Null]));
    }

    #[test]
    fn test_depth() {
        assert_eq!(Value::from(1).depth(), 0);
        let nested = Value::Array(vec![Value::Array(vec![Value::from(1)])]);
        assert_eq!(nested.depth(), 2);
    }
}
