//! Decoded response values.
//!
//! Every response body is decoded into a [`Value`] tree. Typed commands then
//! narrow it with the `into_*` helpers, which fail with
//! [`Error::TypeMismatch`] instead of panicking when the origin answers with
//! an unexpected shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A decoded response value.
///
/// All wire integers arrive as JSON numbers, so numbers are always `f64`.
/// `Bytes` only appears in base64 mode, when a decoded payload is not valid
/// UTF-8.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a key when the value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    fn mismatch<T>(self, expected: &'static str) -> Result<T> {
        Err(Error::TypeMismatch {
            expected,
            found: self.kind(),
        })
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s),
            other => other.mismatch("string"),
        }
    }

    /// Like [`into_string`](Self::into_string), but maps `null` (missing key) to `None`.
    pub fn into_optional_string(self) -> Result<Option<String>> {
        match self {
            Value::Null => Ok(None),
            other => other.into_string().map(Some),
        }
    }

    /// Raw payload bytes of a string or binary value.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Value::String(s) => Ok(s.into_bytes()),
            Value::Bytes(b) => Ok(b),
            other => other.mismatch("bytes"),
        }
    }

    /// Integer reply. Fractional parts are truncated.
    pub fn into_i64(self) -> Result<i64> {
        match self {
            Value::Number(n) => Ok(n as i64),
            other => other.mismatch("integer"),
        }
    }

    /// Float reply. Bulk-string floats (as returned by `INCRBYFLOAT`) are parsed.
    pub fn into_f64(self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(n),
            Value::String(s) => s.trim().parse().map_err(|_| Error::TypeMismatch {
                expected: "float",
                found: "string",
            }),
            other => other.mismatch("float"),
        }
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(b),
            other => other.mismatch("bool"),
        }
    }

    pub fn into_array(self) -> Result<Vec<Value>> {
        match self {
            Value::Array(items) => Ok(items),
            other => other.mismatch("array"),
        }
    }

    pub fn into_map(self) -> Result<BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Ok(map),
            other => other.mismatch("map"),
        }
    }

    /// Array of strings; `null` elements become empty strings.
    pub fn into_string_vec(self) -> Result<Vec<String>> {
        self.into_array()?
            .into_iter()
            .map(|item| item.into_optional_string().map(Option::unwrap_or_default))
            .collect()
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("(nil)"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Array(_) | Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}
