//! Client configuration with documented defaults.
//!
//! [`Options`] is plain data: build it with struct-update syntax or the
//! `with_*` helpers, optionally fill the gaps from the environment with
//! [`Options::from_env`], then hand it to [`Upstash::new`](crate::Upstash::new).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::rest::RetryConfig;

/// Environment variable holding the REST URL.
pub const URL_ENV: &str = "UPSTASH_REDIS_REST_URL";
/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "UPSTASH_REDIS_REST_TOKEN";
/// Environment variable holding the optional edge URL.
pub const EDGE_URL_ENV: &str = "UPSTASH_REDIS_EDGE_URL";
/// Any non-empty value turns telemetry headers off.
pub const DISABLE_TELEMETRY_ENV: &str = "UPSTASH_DISABLE_TELEMETRY";

/// Default coalescing window for auto-pipelining.
pub const DEFAULT_AUTO_PIPELINE_WINDOW: Duration = Duration::from_millis(50);

/// Callback receiving the command name and how long the call took.
pub type LatencyLogger = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Report one call's latency to the debug log and the optional callback.
pub(crate) fn record_latency(logger: Option<&LatencyLogger>, command_name: &str, elapsed: Duration) {
    debug!(
        "{command_name} completed in {:.1}ms",
        elapsed.as_secs_f64() * 1000.0
    );
    if let Some(logger) = logger {
        logger(command_name, elapsed);
    }
}

/// Configuration for an [`Upstash`](crate::Upstash) client.
#[derive(Clone)]
pub struct Options {
    /// REST endpoint, e.g. `https://eu1-example.upstash.io`. Required.
    pub url: String,
    /// Read-only, lower-latency endpoint. When set, every read goes there.
    pub edge_url: Option<String>,
    /// Bearer token sent with every request.
    pub token: String,
    /// Ask the origin for base64-encoded strings and decode them client-side.
    /// Default: `false`.
    pub enable_base64: bool,
    /// Skip the SDK/runtime telemetry headers. Default: `false`.
    pub disable_telemetry: bool,
    /// Retry policy for network failures. Default: 5 attempts, `50ms * e^n` backoff.
    pub retry: RetryConfig,
    /// Externally supplied HTTP client. Default: a fresh `reqwest::Client`.
    pub http_client: Option<reqwest::Client>,
    /// Per-request timeout for reads and writes (not streams). Default: none.
    pub request_timeout: Option<Duration>,
    /// Coalesce [`send`](crate::Upstash::send) calls into pipelines. Default: `false`.
    pub auto_pipeline: bool,
    /// How long the first queued command waits for company. Default: 50ms.
    pub auto_pipeline_window: Duration,
    /// Invoked after every facade command. Default: none.
    pub latency_logger: Option<LatencyLogger>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: String::new(),
            edge_url: None,
            token: String::new(),
            enable_base64: false,
            disable_telemetry: false,
            retry: RetryConfig::default(),
            http_client: None,
            request_timeout: None,
            auto_pipeline: false,
            auto_pipeline_window: DEFAULT_AUTO_PIPELINE_WINDOW,
            latency_logger: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("url", &self.url)
            .field("edge_url", &self.edge_url)
            .field("token", &"<redacted>")
            .field("enable_base64", &self.enable_base64)
            .field("disable_telemetry", &self.disable_telemetry)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .field("auto_pipeline", &self.auto_pipeline)
            .field("auto_pipeline_window", &self.auto_pipeline_window)
            .field("latency_logger", &self.latency_logger.is_some())
            .finish_non_exhaustive()
    }
}

impl Options {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            ..Default::default()
        }
    }

    /// Defaults with URL, token and edge URL read from the environment.
    pub fn from_env() -> Self {
        Self::default().fill_from_env()
    }

    /// Fill any empty URL, token or edge URL from the environment, and turn
    /// telemetry off when `UPSTASH_DISABLE_TELEMETRY` is set.
    pub fn fill_from_env(self) -> Self {
        self.fill_from(|name| std::env::var(name).ok())
    }

    fn fill_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if self.url.is_empty()
            && let Some(url) = non_empty(URL_ENV)
        {
            self.url = url;
        }
        if self.token.is_empty()
            && let Some(token) = non_empty(TOKEN_ENV)
        {
            self.token = token;
        }
        if self.edge_url.is_none() {
            self.edge_url = non_empty(EDGE_URL_ENV);
        }
        if non_empty(DISABLE_TELEMETRY_ENV).is_some() {
            self.disable_telemetry = true;
        }
        self
    }

    pub fn with_edge_url(mut self, edge_url: impl Into<String>) -> Self {
        self.edge_url = Some(edge_url.into());
        self
    }

    pub fn with_base64(mut self, enabled: bool) -> Self {
        self.enable_base64 = enabled;
        self
    }

    pub fn with_telemetry_disabled(mut self) -> Self {
        self.disable_telemetry = true;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enable auto-pipelining with the given coalescing window.
    pub fn with_auto_pipeline(mut self, window: Duration) -> Self {
        self.auto_pipeline = true;
        self.auto_pipeline_window = window;
        self
    }

    pub fn with_latency_logger(
        mut self,
        logger: impl Fn(&str, Duration) + Send + Sync + 'static,
    ) -> Self {
        self.latency_logger = Some(Arc::new(logger));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_documented_values() {
        let options = Options::default();
        assert_eq!(options.retry.max_attempts, 5);
        assert_eq!(options.auto_pipeline_window, Duration::from_millis(50));
        assert!(!options.enable_base64);
        assert!(!options.auto_pipeline);
        assert!(options.edge_url.is_none());
        assert!(!options.disable_telemetry);
    }

    #[test]
    fn telemetry_env_opts_out() {
        let options = Options::default().fill_from(env(&[(DISABLE_TELEMETRY_ENV, "1")]));
        assert!(options.disable_telemetry);

        let options = Options::default().fill_from(env(&[(DISABLE_TELEMETRY_ENV, "")]));
        assert!(!options.disable_telemetry);
    }

    #[test]
    fn env_fills_missing_fields() {
        let options = Options::default().fill_from(env(&[
            (URL_ENV, "https://example.upstash.io"),
            (TOKEN_ENV, "tok"),
            (EDGE_URL_ENV, "https://edge.upstash.io"),
        ]));
        assert_eq!(options.url, "https://example.upstash.io");
        assert_eq!(options.token, "tok");
        assert_eq!(options.edge_url.as_deref(), Some("https://edge.upstash.io"));
    }

    #[test]
    fn explicit_values_win_over_env() {
        let options = Options::new("https://mine", "mine").fill_from(env(&[
            (URL_ENV, "https://theirs"),
            (TOKEN_ENV, "theirs"),
        ]));
        assert_eq!(options.url, "https://mine");
        assert_eq!(options.token, "mine");
    }

    #[test]
    fn empty_edge_env_is_ignored() {
        let options = Options::default().fill_from(env(&[(EDGE_URL_ENV, "")]));
        assert!(options.edge_url.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", Options::new("https://x", "super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
