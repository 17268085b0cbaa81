//! Error type shared by the transport core and the command facade.
//!
//! Every failure is a single [`Error`] value with a human-readable message.
//! The message prefixes are stable (`"unable to marshal request body"`,
//! `"response returned status code 500"`, ...) so callers can match on them,
//! but the variants are there for callers that would rather match on kind.

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`RestClient`](crate::rest::RestClient) and
/// [`Upstash`](crate::Upstash).
#[derive(Debug, Error)]
pub enum Error {
    /// The client configuration is unusable (e.g. no REST URL).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The request body could not be serialized to JSON. Never retried.
    #[error("unable to marshal request body: {0}")]
    Marshal(#[source] serde_json::Error),

    /// The HTTP request could not be built (malformed URL, bad header). Never retried.
    #[error("unable to create request: {0}")]
    Request(#[source] reqwest::Error),

    /// No HTTP response was obtained, even after retrying.
    #[error("unable to perform request after {attempts} attempt(s): {source}")]
    Network {
        /// How many attempts were made before giving up.
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The origin answered with a non-2xx status and a JSON object body.
    #[error("response returned status code {status}: {body}, path: {path}")]
    Status {
        status: u16,
        /// The response body, pretty-printed.
        body: String,
        /// The request path, e.g. `/get/foo`.
        path: String,
    },

    /// The origin answered with a non-2xx status and a body that is not a JSON object.
    #[error("unable to decode response body of bad response: {status}: {source}")]
    UndecodableStatus {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    /// The response body could not be read off the wire.
    #[error("unable to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// A 2xx response body was not valid JSON.
    #[error("unable to unmarshal response: {0}")]
    Decode(#[source] serde_json::Error),

    /// A 2xx response carried an `{"error": "..."}` envelope. The message is
    /// the origin's error string, verbatim.
    #[error("{0}")]
    Logical(String),

    /// The caller's cancellation token fired before the call completed.
    #[error("request cancelled by caller")]
    Cancelled,

    /// Opening an event stream returned a non-2xx status.
    #[error("stream request returned status code {0}")]
    StreamStatus(u16),

    /// Opening an event stream failed at the network level.
    #[error("unable to perform stream request: {0}")]
    StreamNetwork(#[source] reqwest::Error),

    /// The decoded result did not have the shape the command expects.
    #[error("unexpected return type: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The auto-pipeline flush task is gone (its runtime shut down).
    #[error("auto-pipeline flush task is no longer running")]
    PipelineClosed,

    /// An auto-pipelined batch failed as a whole; every command queued in it
    /// receives the same underlying error.
    #[error("{0}")]
    Batch(Arc<Error>),
}

impl Error {
    /// Whether the caller gave up, as opposed to the origin or network failing.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Batch(inner) => inner.is_cancelled(),
            _ => false,
        }
    }

    /// Whether the error was reported by the origin inside an envelope.
    pub fn is_logical(&self) -> bool {
        match self {
            Error::Logical(_) => true,
            Error::Batch(inner) => inner.is_logical(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_error_message_is_verbatim() {
        let err = Error::Logical("ERR wrong number of arguments".into());
        assert_eq!(err.to_string(), "ERR wrong number of arguments");
        assert!(err.is_logical());
    }

    #[test]
    fn status_error_mentions_code_and_path() {
        let err = Error::Status {
            status: 500,
            body: "{\n  \"error\": \"boom\"\n}".into(),
            path: "/get/foo".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("response returned status code 500"));
        assert!(msg.ends_with("path: /get/foo"));
    }

    #[test]
    fn batch_error_delegates_classification() {
        let err = Error::Batch(Arc::new(Error::Cancelled));
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "request cancelled by caller");
    }
}
