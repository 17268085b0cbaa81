//! REST transport core: everything between a command and the HTTP API.
//!
//! - [`RestClient`]: builds requests, routes reads to the edge endpoint when
//!   one is configured, retries network failures, and decodes envelopes.
//! - [`retry`]: attempt limit and backoff function.
//! - [`envelope`]: `{"result"}` / `{"error"}` interpretation and base64
//!   result decoding.
//! - [`streaming`]: Server-Sent-Events reader feeding a cancellable channel.

pub mod envelope;
pub mod retry;
pub mod streaming;

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::Options;
use crate::error::{Error, Result};
use crate::value::Value;

pub use retry::{BackoffFn, RetryConfig};

/// Header asking the origin to base64-encode string results.
pub const ENCODING_HEADER: &str = "Upstash-Encoding";

/// Telemetry header naming this SDK and its version.
pub const TELEMETRY_SDK_HEADER: &str = "Upstash-Telemetry-Sdk";
/// Telemetry header naming the language runtime.
pub const TELEMETRY_RUNTIME_HEADER: &str = "Upstash-Telemetry-Runtime";

const SDK_TELEMETRY: &str = concat!("upstash-rs@v", env!("CARGO_PKG_VERSION"));

/// Content type of event-stream responses.
pub const EVENT_STREAM: &str = "text/event-stream";

// ── Request ────────────────────────────────────────────────────────

/// One outbound call: URL path segments and an optional JSON body.
#[derive(Debug, Clone)]
pub struct Request<B = ()> {
    pub path: Vec<String>,
    pub body: Option<B>,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// A request against the root path with no body.
    pub fn new() -> Self {
        Self {
            path: Vec::new(),
            body: None,
        }
    }

    /// A request against `{base}/{segments joined by '/'}`.
    pub fn at<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: segments.into_iter().map(Into::into).collect(),
            body: None,
        }
    }
}

impl<B> Request<B> {
    /// Attach a body, serialized as JSON when the request is written.
    pub fn with_body<C: Serialize>(self, body: C) -> Request<C> {
        Request {
            path: self.path,
            body: Some(body),
        }
    }

    fn label(&self) -> String {
        format!("/{}", self.path.join("/"))
    }
}

// ── Client ─────────────────────────────────────────────────────────

struct Inner {
    http: reqwest::Client,
    url: Url,
    edge_url: Option<Url>,
    token: String,
    base64: bool,
    telemetry: bool,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

/// Stateless HTTP transport for the REST API.
///
/// Cloning is cheap and clones share the underlying connection pool. The
/// configuration is immutable, so a client can be used from any number of
/// tasks at once.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("url", &self.inner.url.as_str())
            .field("edge_url", &self.inner.edge_url.as_ref().map(Url::as_str))
            .field("base64", &self.inner.base64)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

fn parse_base(label: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("invalid {label} {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("{label} {raw:?} cannot be used as a base URL")));
    }
    Ok(url)
}

impl RestClient {
    /// Create a client for `url` with default settings.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::from_options(&Options::new(url, token))
    }

    /// Create a client from the transport-related parts of `options`.
    pub fn from_options(options: &Options) -> Result<Self> {
        if options.url.is_empty() {
            return Err(Error::Config("missing REST URL".into()));
        }
        let url = parse_base("REST URL", &options.url)?;
        let edge_url = match options.edge_url.as_deref() {
            Some(raw) if !raw.is_empty() => Some(parse_base("edge URL", raw)?),
            _ => None,
        };
        let http = match &options.http_client {
            Some(client) => client.clone(),
            None => reqwest::Client::builder()
                .user_agent(concat!("upstash-rs/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                url,
                edge_url,
                token: options.token.clone(),
                base64: options.enable_base64,
                telemetry: !options.disable_telemetry,
                retry: options.retry.clone(),
                timeout: options.request_timeout,
            }),
        })
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn edge_url(&self) -> Option<&Url> {
        self.inner.edge_url.as_ref()
    }

    pub fn base64_enabled(&self) -> bool {
        self.inner.base64
    }

    /// Issue a `GET`. Goes to the edge endpoint when one is configured.
    pub async fn read(&self, cancel: &CancellationToken, request: Request) -> Result<Value> {
        let base = self.inner.edge_url.as_ref().unwrap_or(&self.inner.url);
        self.call(cancel, Method::GET, base, &request, None).await
    }

    /// Issue a `POST` to the main endpoint with the JSON-serialized body.
    ///
    /// Serialization happens before anything touches the network, so a body
    /// that cannot be represented as JSON fails with [`Error::Marshal`] and no
    /// request is sent.
    pub async fn write<B: Serialize>(
        &self,
        cancel: &CancellationToken,
        request: Request<B>,
    ) -> Result<Value> {
        let body = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(Error::Marshal)?;
        trace!("Request payload size: {} bytes", body.as_ref().map_or(0, Vec::len));
        self.call(cancel, Method::POST, &self.inner.url, &request, body)
            .await
    }

    /// Open a Server-Sent-Events stream on the main endpoint.
    ///
    /// Never retried: a partially consumed stream cannot be replayed. Pass the
    /// response to [`streaming::spawn_reader`] to receive its messages.
    pub async fn stream(
        &self,
        cancel: &CancellationToken,
        request: Request,
    ) -> Result<reqwest::Response> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let url = self.endpoint(&self.inner.url, &request.path)?;
        let http_request = self
            .inner
            .http
            .get(url)
            .bearer_auth(&self.inner.token)
            .header(ACCEPT, EVENT_STREAM)
            .build()
            .map_err(Error::Request)?;

        debug!("Opening event stream {}", request.label());
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            sent = self.inner.http.execute(http_request) => sent.map_err(Error::StreamNetwork)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::StreamStatus(status.as_u16()));
        }
        Ok(response)
    }

    fn endpoint(&self, base: &Url, path: &[String]) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("{base} cannot be used as a base URL")))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    fn build(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<reqwest::Request> {
        let mut builder = self
            .inner
            .http
            .request(method, url)
            .bearer_auth(&self.inner.token)
            .header(CONTENT_TYPE, "application/json");
        if self.inner.base64 {
            builder = builder.header(ENCODING_HEADER, "base64");
        }
        if self.inner.telemetry {
            builder = builder
                .header(TELEMETRY_SDK_HEADER, SDK_TELEMETRY)
                .header(TELEMETRY_RUNTIME_HEADER, "rust");
        }
        if let Some(timeout) = self.inner.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        builder.build().map_err(Error::Request)
    }

    async fn call<B>(
        &self,
        cancel: &CancellationToken,
        method: Method,
        base: &Url,
        request: &Request<B>,
        body: Option<Vec<u8>>,
    ) -> Result<Value> {
        let label = request.label();
        let url = self.endpoint(base, &request.path)?;
        let attempts = self.inner.retry.attempts();
        let start = Instant::now();

        let mut attempt = 0;
        let response = loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let http_request = self.build(method.clone(), url.clone(), body.clone())?;
            debug!("{method} {label} (attempt {}/{attempts})", attempt + 1);

            let sent = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                sent = self.inner.http.execute(http_request) => sent,
            };
            match sent {
                Ok(response) => break response,
                Err(source) => {
                    attempt += 1;
                    if attempt >= attempts {
                        warn!("{method} {label} failed after {attempt} attempt(s): {source}");
                        return Err(Error::Network {
                            attempts: attempt,
                            source,
                        });
                    }
                    let delay = self.inner.retry.delay_for_attempt(attempt - 1);
                    warn!("{method} {label} failed ({source}), retrying in {delay:?}");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        let status = response.status();
        let bytes = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            read = response.bytes() => read.map_err(Error::Body)?,
        };
        debug!(
            "{method} {label}: HTTP {status} in {:.1}ms ({} bytes)",
            start.elapsed().as_secs_f64() * 1000.0,
            bytes.len()
        );

        if !status.is_success() {
            return Err(status_error(status, &bytes, label));
        }

        let decoded: Value = serde_json::from_slice(&bytes).map_err(Error::Decode)?;
        envelope::interpret(decoded, self.inner.base64)
    }
}

/// Build the error for a non-2xx response, pretty-printing a JSON object body.
fn status_error(status: StatusCode, body: &[u8], path: String) -> Error {
    match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(body) {
        Ok(object) => {
            let body = serde_json::to_string_pretty(&object).unwrap_or_else(|_| format!("{object:?}"));
            Error::Status {
                status: status.as_u16(),
                body,
                path,
            }
        }
        Err(source) => Error::UndecodableStatus { status, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> RestClient {
        RestClient::new(url, "token").unwrap()
    }

    #[test]
    fn endpoint_joins_segments() {
        let c = client("http://example.com");
        let url = c.endpoint(c.url(), &["get".into(), "foo".into()]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/get/foo");
    }

    #[test]
    fn endpoint_keeps_base_path_and_escapes_segments() {
        let c = client("http://example.com/prefix/");
        let url = c.endpoint(c.url(), &["get".into(), "a/b c".into()]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/prefix/get/a%2Fb%20c");
    }

    #[test]
    fn empty_path_targets_root() {
        let c = client("http://example.com");
        let url = c.endpoint(c.url(), &[]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/");
    }

    #[test]
    fn missing_url_is_rejected() {
        let err = RestClient::new("", "token").unwrap_err();
        assert!(err.to_string().contains("missing REST URL"));
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(matches!(RestClient::new("not a url", "t"), Err(Error::Config(_))));
    }

    #[test]
    fn build_sets_headers() {
        let options = Options::new("http://example.com", "secret").with_base64(true);
        let c = RestClient::from_options(&options).unwrap();
        let req = c
            .build(Method::GET, c.url().clone(), None)
            .unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer secret");
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(req.headers()[ENCODING_HEADER], "base64");
        assert!(
            req.headers()[TELEMETRY_SDK_HEADER]
                .to_str()
                .unwrap()
                .starts_with("upstash-rs@v")
        );
        assert_eq!(req.headers()[TELEMETRY_RUNTIME_HEADER], "rust");
    }

    #[test]
    fn telemetry_headers_can_be_disabled() {
        let options = Options::new("http://example.com", "secret").with_telemetry_disabled();
        let c = RestClient::from_options(&options).unwrap();
        let req = c.build(Method::GET, c.url().clone(), None).unwrap();
        assert!(req.headers().get(TELEMETRY_SDK_HEADER).is_none());
        assert!(req.headers().get(TELEMETRY_RUNTIME_HEADER).is_none());
    }

    #[test]
    fn status_error_pretty_prints_object() {
        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"error":"Internal Server Error"}"#,
            "/get".into(),
        );
        let msg = err.to_string();
        assert!(msg.contains("response returned status code 500"));
        assert!(msg.contains("\"error\": \"Internal Server Error\""));
        assert!(msg.contains("path: /get"));
    }

    #[test]
    fn status_error_without_json_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, b"<html>", "/".into());
        assert!(
            err.to_string()
                .starts_with("unable to decode response body of bad response: 502 Bad Gateway")
        );
    }

    #[test]
    fn request_builders() {
        let req = Request::at(["get", "foo"]);
        assert_eq!(req.label(), "/get/foo");
        let req = Request::new().with_body(vec!["SET", "k", "v"]);
        assert_eq!(req.label(), "/");
        assert_eq!(req.body, Some(vec!["SET", "k", "v"]));
    }
}
