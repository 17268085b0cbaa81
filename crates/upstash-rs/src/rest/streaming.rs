//! Server-Sent Events (SSE) reader for pub/sub and `MONITOR` streams.
//!
//! [`spawn_reader`] moves an open event-stream response onto its own task
//! and hands back a bounded channel of message payloads. Only `data: ` lines
//! carry messages; comments and other SSE fields are skipped. When the origin
//! JSON-encodes a string payload, one layer of surrounding quotes is removed.
//!
//! The channel closes when the stream ends, a read fails, a line grows past
//! [`MAX_LINE_BYTES`], the caller cancels, or the receiver is dropped.
//! Mid-stream failures are logged and simply end the channel; no final error
//! value is delivered.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Capacity of the channel between the reader task and the consumer.
pub const STREAM_CHANNEL_CAPACITY: usize = 16;

/// Longest line the reader buffers before giving up on the stream.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

const DATA_PREFIX: &str = "data: ";

/// Spawn a task that reads `response` as an event stream and forwards each
/// message payload on the returned channel.
pub fn spawn_reader(response: reqwest::Response, cancel: CancellationToken) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    tokio::spawn(read_events(response, tx, cancel));
    rx
}

async fn read_events(
    mut response: reqwest::Response,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    // Raw bytes, so multi-byte characters split across chunks survive.
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Event stream cancelled by caller");
                return;
            }
            () = tx.closed() => {
                debug!("Event stream receiver dropped");
                return;
            }
            chunk = response.chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                buffer.extend_from_slice(&bytes);
                while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                    if line.len() > MAX_LINE_BYTES {
                        warn!("Event stream line of {} bytes exceeds {MAX_LINE_BYTES}", line.len());
                        return;
                    }
                    if let Some(message) = parse_line(&line)
                        && !deliver(&tx, &cancel, message).await
                    {
                        return;
                    }
                }
                if buffer.len() > MAX_LINE_BYTES {
                    warn!("Event stream line exceeds {MAX_LINE_BYTES} bytes without a newline");
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read event stream chunk: {e}");
                return;
            }
        }
    }

    // Final line without a trailing newline.
    if let Some(message) = parse_line(&buffer) {
        deliver(&tx, &cancel, message).await;
    }
    debug!("Event stream closed by origin");
}

/// Send one message, giving up if the caller cancels or stops listening.
async fn deliver(tx: &mpsc::Sender<String>, cancel: &CancellationToken, message: String) -> bool {
    trace!("Event stream message: {message}");
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        sent = tx.send(message) => sent.is_ok(),
    }
}

/// Extract the payload of a single SSE line, if it is a `data: ` line.
pub fn parse_line(line: &[u8]) -> Option<String> {
    let decoded = String::from_utf8_lossy(line);
    let text: &str = &decoded;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    let data = text.strip_prefix(DATA_PREFIX)?;
    Some(unquote(data).to_string())
}

/// Strip exactly one layer of surrounding double quotes.
fn unquote(data: &str) -> &str {
    if data.len() < 2 {
        return data;
    }
    data.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_data_line() {
        assert_eq!(parse_line(b"data: hello\n"), Some("hello".to_string()));
    }

    #[test]
    fn quoted_data_is_unquoted_once() {
        assert_eq!(parse_line(b"data: \"quoted\"\n"), Some("quoted".to_string()));
        assert_eq!(
            parse_line(b"data: \"\"double\"\"\n"),
            Some("\"double\"".to_string())
        );
    }

    #[test]
    fn lone_quote_is_kept() {
        assert_eq!(parse_line(b"data: \"\n"), Some("\"".to_string()));
    }

    #[test]
    fn crlf_line_endings() {
        assert_eq!(parse_line(b"data: msg\r\n"), Some("msg".to_string()));
    }

    #[test]
    fn non_data_lines_are_ignored() {
        assert_eq!(parse_line(b"\n"), None);
        assert_eq!(parse_line(b": keep-alive\n"), None);
        assert_eq!(parse_line(b"event: message\n"), None);
        assert_eq!(parse_line(b"data:nospace\n"), None);
    }

    #[test]
    fn unterminated_final_line() {
        assert_eq!(parse_line(b"data: tail"), Some("tail".to_string()));
    }

    #[test]
    fn subscribe_payload_shape() {
        assert_eq!(
            parse_line(b"data: message,news,hello world\n"),
            Some("message,news,hello world".to_string())
        );
    }
}
