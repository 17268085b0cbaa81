//! Pipelines and transactions: many commands in one HTTP call.
//!
//! A [`Pipeline`] is posted to `/pipeline` and runs its commands in order
//! without atomicity. A [`Multi`] is posted to `/multi-exec` and asks the
//! origin to apply them atomically. Both return the origin's per-command
//! envelopes in push order; interpret each one with
//! [`unwrap_item`](crate::rest::envelope::unwrap_item).

use std::fmt;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{LatencyLogger, record_latency};
use crate::error::Result;
use crate::rest::{Request, RestClient};
use crate::value::Value;

pub(crate) type Command = Vec<serde_json::Value>;

/// Build `[command, args...]`.
pub(crate) fn command<I, A>(name: &str, args: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<serde_json::Value>,
{
    std::iter::once(serde_json::Value::from(name))
        .chain(args.into_iter().map(Into::into))
        .collect()
}

#[derive(Clone)]
struct Batch {
    path: &'static str,
    client: RestClient,
    cancel: CancellationToken,
    latency_logger: Option<LatencyLogger>,
    commands: Vec<Command>,
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("path", &self.path)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl Batch {
    fn new(
        path: &'static str,
        client: RestClient,
        cancel: CancellationToken,
        latency_logger: Option<LatencyLogger>,
    ) -> Self {
        Self {
            path,
            client,
            cancel,
            latency_logger,
            commands: Vec::new(),
        }
    }

    async fn exec(&self) -> Result<Vec<Value>> {
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Executing /{} with {} command(s)", self.path, self.commands.len());
        let start = Instant::now();
        let result = self
            .client
            .write(&self.cancel, Request::at([self.path]).with_body(&self.commands))
            .await;
        record_latency(
            self.latency_logger.as_ref(),
            &self.path.to_uppercase(),
            start.elapsed(),
        );
        match result? {
            Value::Null => Ok(Vec::new()),
            other => other.into_array(),
        }
    }
}

/// Commands sent together to `/pipeline`, executed in order, not atomically.
#[derive(Debug, Clone)]
pub struct Pipeline(Batch);

impl Pipeline {
    pub(crate) fn new(
        client: RestClient,
        cancel: CancellationToken,
        latency_logger: Option<LatencyLogger>,
    ) -> Self {
        Self(Batch::new("pipeline", client, cancel, latency_logger))
    }

    /// Queue a command.
    pub fn push<I, A>(&mut self, command_name: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<serde_json::Value>,
    {
        self.0.commands.push(command(command_name, args));
        self
    }

    pub fn len(&self) -> usize {
        self.0.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.commands.is_empty()
    }

    /// Send every queued command in one call. An empty pipeline makes no call.
    pub async fn exec(&self) -> Result<Vec<Value>> {
        self.0.exec().await
    }
}

/// Commands sent together to `/multi-exec` and applied atomically.
#[derive(Debug, Clone)]
pub struct Multi(Batch);

impl Multi {
    pub(crate) fn new(
        client: RestClient,
        cancel: CancellationToken,
        latency_logger: Option<LatencyLogger>,
    ) -> Self {
        Self(Batch::new("multi-exec", client, cancel, latency_logger))
    }

    /// Queue a command.
    pub fn push<I, A>(&mut self, command_name: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<serde_json::Value>,
    {
        self.0.commands.push(command(command_name, args));
        self
    }

    /// Drop every queued command. Nothing is sent to the origin.
    pub fn discard(&mut self) {
        self.0.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.0.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.commands.is_empty()
    }

    /// Send every queued command as one transaction. An empty transaction makes no call.
    pub async fn exec(&self) -> Result<Vec<Value>> {
        self.0.exec().await
    }
}
