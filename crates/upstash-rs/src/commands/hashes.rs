use std::collections::BTreeMap;

use super::with_key;
use crate::{Upstash, Value};
use crate::error::{Error, Result};

impl Upstash {
    /// `HSET key field value [field value ...]`. Returns how many fields were added.
    pub async fn hset(&self, key: &str, pairs: &[(&str, &str)]) -> Result<i64> {
        let fields: Vec<&str> = pairs.iter().flat_map(|(f, v)| [*f, *v]).collect();
        self.send("HSET", with_key(key, &fields)).await?.into_i64()
    }

    /// `HGET key field`. `None` when the field or key does not exist.
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.send("HGET", [key, field]).await?.into_optional_string()
    }

    /// `HGETALL key` as a field to value map.
    pub async fn hget_all(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let flat = match self.send("HGETALL", [key]).await? {
            Value::Null => return Ok(BTreeMap::new()),
            other => other.into_string_vec()?,
        };
        pairs_to_map(flat)
    }

    /// `HDEL key field...`. Returns how many fields were removed.
    pub async fn hdel(&self, key: &str, fields: &[&str]) -> Result<i64> {
        self.send("HDEL", with_key(key, fields)).await?.into_i64()
    }

    pub async fn hlen(&self, key: &str) -> Result<i64> {
        self.send("HLEN", [key]).await?.into_i64()
    }
}

fn pairs_to_map(flat: Vec<String>) -> Result<BTreeMap<String, String>> {
    if flat.len() % 2 != 0 {
        return Err(Error::TypeMismatch {
            expected: "field/value pairs",
            found: "odd-length array",
        });
    }
    let mut map = BTreeMap::new();
    let mut items = flat.into_iter();
    while let (Some(field), Some(value)) = (items.next(), items.next()) {
        map.insert(field, value);
    }
    Ok(map)
}
