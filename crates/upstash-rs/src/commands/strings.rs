use serde_json::json;

use crate::error::Result;
use crate::{Upstash, Value};

/// Options for [`Upstash::set_with_options`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Expire after this many seconds.
    pub ex: Option<u64>,
    /// Expire after this many milliseconds. Ignored when `ex` is set.
    pub px: Option<u64>,
    /// Only set the key if it does not exist.
    pub nx: bool,
    /// Only set the key if it already exists. Ignored when `nx` is set.
    pub xx: bool,
}

impl SetOptions {
    fn args(&self) -> Vec<serde_json::Value> {
        let mut args = Vec::new();
        if let Some(ex) = self.ex {
            args.extend([json!("ex"), json!(ex)]);
        } else if let Some(px) = self.px {
            args.extend([json!("px"), json!(px)]);
        }
        if self.nx {
            args.push(json!("nx"));
        } else if self.xx {
            args.push(json!("xx"));
        }
        args
    }
}

impl Upstash {
    /// `GET key`. `None` when the key does not exist.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read_path(["get", key]).await?.into_optional_string()
    }

    /// `SET key value`.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.send("SET", [key, value]).await.map(drop)
    }

    /// `SET key value [EX s | PX ms] [NX | XX]`. Returns `false` when an
    /// `NX`/`XX` condition prevented the write.
    pub async fn set_with_options(&self, key: &str, value: &str, options: &SetOptions) -> Result<bool> {
        let args = [json!(key), json!(value)].into_iter().chain(options.args());
        Ok(!self.send("SET", args).await?.is_null())
    }

    /// `GETSET key value`. Returns the previous value.
    pub async fn get_set(&self, key: &str, value: &str) -> Result<Option<String>> {
        self.send("GETSET", [key, value]).await?.into_optional_string()
    }

    /// `APPEND key value`. Returns the new length.
    pub async fn append(&self, key: &str, value: &str) -> Result<i64> {
        self.send("APPEND", [key, value]).await?.into_i64()
    }

    pub async fn incr(&self, key: &str) -> Result<i64> {
        self.send("INCR", [key]).await?.into_i64()
    }

    pub async fn incr_by(&self, key: &str, increment: i64) -> Result<i64> {
        self.send("INCRBY", [json!(key), json!(increment)]).await?.into_i64()
    }

    pub async fn incr_by_float(&self, key: &str, increment: f64) -> Result<f64> {
        self.send("INCRBYFLOAT", [json!(key), json!(increment)])
            .await?
            .into_f64()
    }

    pub async fn decr(&self, key: &str) -> Result<i64> {
        self.send("DECR", [key]).await?.into_i64()
    }

    pub async fn decr_by(&self, key: &str, decrement: i64) -> Result<i64> {
        self.send("DECRBY", [json!(key), json!(decrement)]).await?.into_i64()
    }

    /// `MGET key...`. Missing keys are `None`.
    pub async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let path = std::iter::once("mget").chain(keys.iter().copied());
        self.read_path(path)
            .await?
            .into_array()?
            .into_iter()
            .map(Value::into_optional_string)
            .collect()
    }

    /// `MSET key value [key value ...]`.
    pub async fn mset(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let args = pairs.iter().flat_map(|(k, v)| [*k, *v]);
        self.send("MSET", args).await.map(drop)
    }

    /// `STRLEN key`.
    pub async fn strlen(&self, key: &str) -> Result<i64> {
        self.read_path(["strlen", key]).await?.into_i64()
    }
}
