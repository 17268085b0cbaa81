use serde_json::json;

use super::with_key;
use crate::error::Result;
use crate::{Upstash, Value};

impl Upstash {
    /// `LPUSH key element...`. Returns the new length.
    pub async fn lpush(&self, key: &str, elements: &[&str]) -> Result<i64> {
        self.send("LPUSH", with_key(key, elements)).await?.into_i64()
    }

    /// `RPUSH key element...`. Returns the new length.
    pub async fn rpush(&self, key: &str, elements: &[&str]) -> Result<i64> {
        self.send("RPUSH", with_key(key, elements)).await?.into_i64()
    }

    pub async fn lpop(&self, key: &str) -> Result<Option<String>> {
        self.send("LPOP", [key]).await?.into_optional_string()
    }

    pub async fn rpop(&self, key: &str) -> Result<Option<String>> {
        self.send("RPOP", [key]).await?.into_optional_string()
    }

    pub async fn llen(&self, key: &str) -> Result<i64> {
        self.send("LLEN", [key]).await?.into_i64()
    }

    /// `LRANGE key start stop`. Negative indexes count from the tail.
    pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        match self
            .send("LRANGE", [json!(key), json!(start), json!(stop)])
            .await?
        {
            Value::Null => Ok(Vec::new()),
            other => other.into_string_vec(),
        }
    }
}
