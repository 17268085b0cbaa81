//! Response envelope interpretation and base64 result decoding.
//!
//! The REST API wraps every answer as `{"result": ...}` or `{"error": "..."}`.
//! Pipeline and transaction calls answer with a bare array of such envelopes,
//! which is returned untouched so each sub-command can be inspected with
//! [`unwrap_item`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};
use crate::value::Value;

/// Status token the origin never base64-encodes.
const OK_STATUS: &str = "OK";

/// Interpret a single envelope.
///
/// - an object with a non-empty string `error` field fails with that message;
/// - an object with a `result` field yields the field's value;
/// - any other object, array or scalar is returned whole.
pub fn unwrap_item(item: Value) -> Result<Value> {
    match item {
        Value::Map(mut map) => {
            if let Some(Value::String(message)) = map.get("error")
                && !message.is_empty()
            {
                return Err(Error::Logical(message.clone()));
            }
            match map.remove("result") {
                Some(result) => Ok(result),
                None => Ok(Value::Map(map)),
            }
        }
        other => Ok(other),
    }
}

/// Interpret a decoded 2xx response body, applying base64 decoding to the
/// returned value when `base64` is set.
pub(crate) fn interpret(decoded: Value, base64: bool) -> Result<Value> {
    let value = unwrap_item(decoded)?;
    Ok(if base64 { decode_base64(value) } else { value })
}

/// Recursively base64-decode every string leaf.
///
/// `"OK"` is a status token and passes through. Strings that are not valid
/// base64 are kept as they are. Decoded payloads that are not UTF-8 become
/// [`Value::Bytes`]. Never fails.
pub fn decode_base64(value: Value) -> Value {
    match value {
        Value::String(s) if s == OK_STATUS => Value::String(s),
        Value::String(s) => match STANDARD.decode(s.as_bytes()) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Value::String(text),
                Err(e) => Value::Bytes(e.into_bytes()),
            },
            Err(_) => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(decode_base64).collect()),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, decode_base64(v)))
                .collect(),
        ),
        other => other,
    }
}
