//! Transparent coalescing of independent commands into pipelines.
//!
//! When enabled, [`Upstash::send`](crate::Upstash::send) queues its command
//! instead of posting it. A background task waits one window after the first
//! queued command, posts everything collected to `/pipeline`, and answers each
//! caller from its own envelope. Batches are flushed one at a time, so
//! commands reach the origin in the order they were queued.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::batch::Command;
use crate::error::{Error, Result};
use crate::rest::envelope::unwrap_item;
use crate::rest::{Request, RestClient};
use crate::value::Value;

struct Queued {
    command: Command,
    reply: oneshot::Sender<Result<Value>>,
}

struct Shared {
    client: RestClient,
    window: Duration,
    // Started on first use so constructing a client needs no runtime.
    queue: OnceLock<mpsc::UnboundedSender<Queued>>,
}

/// Handle to the flush task. Dropping the last handle stops the task once
/// its queue drains.
#[derive(Clone)]
pub(crate) struct AutoPipeline {
    shared: Arc<Shared>,
}

impl AutoPipeline {
    pub(crate) fn new(client: RestClient, window: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                window,
                queue: OnceLock::new(),
            }),
        }
    }

    fn sender(&self) -> &mpsc::UnboundedSender<Queued> {
        self.shared.queue.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_flusher(self.shared.client.clone(), self.shared.window, rx));
            tx
        })
    }

    /// Queue a command and wait for its individual result.
    pub(crate) async fn enqueue(&self, cancel: &CancellationToken, command: Command) -> Result<Value> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let (reply, answer) = oneshot::channel();
        self.sender()
            .send(Queued { command, reply })
            .map_err(|_| Error::PipelineClosed)?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            answer = answer => answer.unwrap_or(Err(Error::PipelineClosed)),
        }
    }
}

async fn run_flusher(client: RestClient, window: Duration, mut rx: mpsc::UnboundedReceiver<Queued>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        let deadline = tokio::time::Instant::now() + window;
        let mut closed = false;
        while !closed {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => break,
                next = rx.recv() => match next {
                    Some(queued) => batch.push(queued),
                    None => closed = true,
                },
            }
        }
        flush(&client, batch).await;
    }
    debug!("Auto-pipeline queue closed");
}

async fn flush(client: &RestClient, batch: Vec<Queued>) {
    let (commands, replies): (Vec<Command>, Vec<_>) =
        batch.into_iter().map(|q| (q.command, q.reply)).unzip();
    debug!("Auto-pipeline flushing {} command(s)", commands.len());

    // Callers cancel their own wait; the batch itself always completes.
    let cancel = CancellationToken::new();
    let outcome = client
        .write(&cancel, Request::at(["pipeline"]).with_body(&commands))
        .await
        .and_then(Value::into_array);

    match outcome {
        Ok(items) => {
            let mut items = items.into_iter();
            for reply in replies {
                let result = match items.next() {
                    Some(item) => unwrap_item(item),
                    None => Err(Error::TypeMismatch {
                        expected: "pipeline entry",
                        found: "nothing",
                    }),
                };
                let _ = reply.send(result);
            }
        }
        Err(e) => {
            let shared = Arc::new(e);
            for reply in replies {
                let _ = reply.send(Err(Error::Batch(shared.clone())));
            }
        }
    }
}
