use serde_json::json;

use super::with_key;
use crate::error::{Error, Result};
use crate::{Upstash, Value};

/// Options for [`Upstash::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Only return keys matching this glob.
    pub pattern: Option<String>,
    /// Hint for how many keys to return per call.
    pub count: Option<u64>,
    /// Only return keys of this type (`string`, `hash`, ...).
    pub key_type: Option<String>,
}

/// One page of a `SCAN`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Cursor for the next call; `"0"` when the iteration is complete.
    pub cursor: String,
    pub keys: Vec<String>,
}

impl Upstash {
    /// `DEL key...`. Returns how many keys were removed.
    pub async fn del(&self, keys: &[&str]) -> Result<i64> {
        self.send("DEL", keys.iter().copied()).await?.into_i64()
    }

    /// `EXISTS key...`. Returns how many of the keys exist.
    pub async fn exists(&self, keys: &[&str]) -> Result<i64> {
        self.send("EXISTS", keys.iter().copied()).await?.into_i64()
    }

    /// `EXPIRE key seconds`. Returns `true` when the timeout was set.
    pub async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        Ok(self.send("EXPIRE", [json!(key), json!(seconds)]).await?.into_i64()? == 1)
    }

    /// `TTL key`: seconds left, `-1` without expiry, `-2` when missing.
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        self.send("TTL", [key]).await?.into_i64()
    }

    /// `KEYS pattern`.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        match self.read_path(["keys", pattern]).await? {
            Value::Null => Ok(Vec::new()),
            other => other.into_string_vec(),
        }
    }

    /// `SCAN cursor [MATCH pattern] [COUNT n] [TYPE t]`.
    pub async fn scan(&self, cursor: &str, options: &ScanOptions) -> Result<ScanResult> {
        let mut args = vec![json!(cursor)];
        if let Some(pattern) = &options.pattern {
            args.extend([json!("MATCH"), json!(pattern)]);
        }
        if let Some(count) = options.count {
            args.extend([json!("COUNT"), json!(count)]);
        }
        if let Some(key_type) = &options.key_type {
            args.extend([json!("TYPE"), json!(key_type)]);
        }

        let mut page = self.send("SCAN", args).await?.into_array()?.into_iter();
        let (Some(cursor), Some(keys)) = (page.next(), page.next()) else {
            return Err(Error::TypeMismatch {
                expected: "[cursor, keys]",
                found: "short array",
            });
        };
        Ok(ScanResult {
            cursor: cursor.into_string()?,
            keys: keys
                .into_array()?
                .into_iter()
                .map(Value::into_string)
                .collect::<Result<_>>()?,
        })
    }

    /// `FLUSHALL`.
    pub async fn flush_all(&self) -> Result<()> {
        self.send("FLUSHALL", std::iter::empty::<&str>()).await.map(drop)
    }

    /// `PING`.
    pub async fn ping(&self) -> Result<String> {
        self.send("PING", std::iter::empty::<&str>()).await?.into_string()
    }

    /// `ECHO message`.
    pub async fn echo(&self, message: &str) -> Result<String> {
        self.send("ECHO", [message]).await?.into_string()
    }

    /// `RENAME key newkey`.
    pub async fn rename(&self, key: &str, new_key: &str) -> Result<()> {
        self.send("RENAME", with_key(key, &[new_key])).await.map(drop)
    }
}
