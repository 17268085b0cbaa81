//! Async Rust client for the Upstash Redis REST API.
//!
//! `upstash-rs` turns Redis commands into HTTP requests against the REST API
//! and decodes the JSON (or Server-Sent-Events) answers into [`Value`]s. The
//! core is the [`RestClient`](rest::RestClient) transport: read/write routing
//! between the main and edge endpoints, retry with backoff on network
//! failures, envelope interpretation, optional base64 result decoding, and a
//! streaming reader for pub/sub and `MONITOR`.
//!
//! On top of it, [`Upstash`] offers a generic [`send`](Upstash::send), typed
//! commands, [`Pipeline`]/[`Multi`] batches, and optional auto-pipelining.
//!
//! # Getting started
//!
//! ```ignore
//! use upstash_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> upstash_rs::Result<()> {
//!     // Reads UPSTASH_REDIS_REST_URL / UPSTASH_REDIS_REST_TOKEN.
//!     let redis = Upstash::from_env()?;
//!
//!     redis.set("greeting", "hello").await?;
//!     let value = redis.get("greeting").await?;
//!     assert_eq!(value.as_deref(), Some("hello"));
//!
//!     let mut pipeline = redis.pipeline();
//!     pipeline.push("INCR", ["counter"]).push("GET", ["counter"]);
//!     for entry in pipeline.exec().await? {
//!         println!("{:?}", unwrap_item(entry));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Cancellation
//!
//! Every call observes a [`CancellationToken`]. Bind one with
//! [`Upstash::with_cancellation`]; when it fires, in-flight calls (including
//! backoff sleeps) fail with [`Error::Cancelled`] and open streams close.

mod auto_pipeline;
pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod prelude;
pub mod rest;
pub mod value;

use std::time::{Duration, Instant};

use crate::auto_pipeline::AutoPipeline;
use crate::batch::command;
use crate::config::record_latency;

pub use batch::{Multi, Pipeline};
pub use config::Options;
pub use error::{Error, Result};
pub use rest::{Request, RestClient, RetryConfig};
pub use tokio_util::sync::CancellationToken;
pub use value::Value;

// ── Client ─────────────────────────────────────────────────────────

/// Command-level client for the Upstash Redis REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// auto-pipeline queue.
#[derive(Clone)]
pub struct Upstash {
    client: RestClient,
    cancel: CancellationToken,
    auto_pipeline: Option<AutoPipeline>,
    latency_logger: Option<config::LatencyLogger>,
}

impl std::fmt::Debug for Upstash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstash")
            .field("client", &self.client)
            .field("auto_pipeline", &self.auto_pipeline.is_some())
            .finish_non_exhaustive()
    }
}

impl Upstash {
    /// Create a client. Fails when the REST URL is missing or malformed.
    pub fn new(options: Options) -> Result<Self> {
        let client = RestClient::from_options(&options)?;
        let auto_pipeline = options
            .auto_pipeline
            .then(|| AutoPipeline::new(client.clone(), options.auto_pipeline_window));
        Ok(Self {
            client,
            cancel: CancellationToken::new(),
            auto_pipeline,
            latency_logger: options.latency_logger,
        })
    }

    /// Create a client configured entirely from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(Options::from_env())
    }

    /// The underlying transport.
    pub fn rest(&self) -> &RestClient {
        &self.client
    }

    /// A clone whose calls observe `cancel`.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Execute an arbitrary command, e.g. `send("HSET", ["key", "field", "value"])`.
    ///
    /// Returns the decoded `result` of the envelope. Useful for commands that
    /// have no typed wrapper.
    pub async fn send<I, A>(&self, command_name: &str, args: I) -> Result<Value>
    where
        I: IntoIterator<Item = A>,
        A: Into<serde_json::Value>,
    {
        let body = command(command_name, args);
        let start = Instant::now();
        let result = match &self.auto_pipeline {
            Some(queue) => queue.enqueue(&self.cancel, body).await,
            None => {
                self.client
                    .write(&self.cancel, Request::new().with_body(&body))
                    .await
            }
        };
        self.record_latency(command_name, start.elapsed());
        result
    }

    /// Execute a read-only command addressed by URL path, e.g. `["get", key]`.
    /// Served by the edge endpoint when one is configured.
    pub(crate) async fn read_path<I, S>(&self, segments: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = Request::at(segments);
        let name = request
            .path
            .first()
            .map(|segment| segment.to_uppercase())
            .unwrap_or_default();
        let start = Instant::now();
        let result = self.client.read(&self.cancel, request).await;
        self.record_latency(&name, start.elapsed());
        result
    }

    fn record_latency(&self, command_name: &str, elapsed: Duration) {
        record_latency(self.latency_logger.as_ref(), command_name, elapsed);
    }

    /// Start a pipeline bound to this client's cancellation token.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.client.clone(),
            self.cancel.clone(),
            self.latency_logger.clone(),
        )
    }

    /// Start a transaction bound to this client's cancellation token.
    pub fn multi(&self) -> Multi {
        Multi::new(
            self.client.clone(),
            self.cancel.clone(),
            self.latency_logger.clone(),
        )
    }

    /// Alias for [`multi`](Self::multi).
    pub fn tx(&self) -> Multi {
        self.multi()
    }
}
