use super::with_key;
use crate::error::Result;
use crate::{Upstash, Value};

impl Upstash {
    /// `SADD key member...`. Returns how many members were added.
    pub async fn sadd(&self, key: &str, members: &[&str]) -> Result<i64> {
        self.send("SADD", with_key(key, members)).await?.into_i64()
    }

    /// `SREM key member...`. Returns how many members were removed.
    pub async fn srem(&self, key: &str, members: &[&str]) -> Result<i64> {
        self.send("SREM", with_key(key, members)).await?.into_i64()
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        match self.send("SMEMBERS", [key]).await? {
            Value::Null => Ok(Vec::new()),
            other => other.into_string_vec(),
        }
    }

    pub async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self.send("SISMEMBER", [key, member]).await?.into_i64()? == 1)
    }

    pub async fn scard(&self, key: &str) -> Result<i64> {
        self.send("SCARD", [key]).await?.into_i64()
    }
}
