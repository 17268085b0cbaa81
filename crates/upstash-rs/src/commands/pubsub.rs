use tokio::sync::mpsc;

use crate::error::Result;
use crate::rest::{Request, streaming};
use crate::Upstash;

impl Upstash {
    /// `PUBLISH channel message`. Returns how many subscribers received it.
    pub async fn publish(&self, channel: &str, message: &str) -> Result<i64> {
        self.send("PUBLISH", [channel, message]).await?.into_i64()
    }

    /// Subscribe to `channel`.
    ///
    /// Each event's `data:` payload arrives on the returned receiver, starting
    /// with the subscription confirmation. The receiver closes when the server
    /// ends the stream or this client's cancellation token fires.
    pub async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>> {
        self.open_stream(Request::at(["subscribe", channel])).await
    }

    /// Stream every command the server processes (`MONITOR`).
    pub async fn monitor(&self) -> Result<mpsc::Receiver<String>> {
        self.open_stream(Request::at(["monitor"])).await
    }

    async fn open_stream(&self, request: Request) -> Result<mpsc::Receiver<String>> {
        let response = self.client.stream(&self.cancel, request).await?;
        Ok(streaming::spawn_reader(response, self.cancel.clone()))
    }
}
