//! Retry with exponential backoff for network-level failures.
//!
//! Only failures where no HTTP response was obtained at all (connection
//! refused, reset, timeout, TLS) are retried. An HTTP error status or an
//! `{"error": ...}` envelope is an answer from the origin and ends the loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Maps a retry attempt index (0 for the wait before the second attempt) to a
/// wait duration.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Default number of attempts per call, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base delay of the default backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(50);

/// Default backoff: `50ms * e^attempt`.
pub fn exponential_backoff(attempt: u32) -> Duration {
    let secs = DEFAULT_BACKOFF_BASE.as_secs_f64() * f64::from(attempt).exp();
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Configuration for retry behavior.
#[derive(Clone)]
pub struct RetryConfig {
    /// Total attempts per call (1 = no retries). Zero is treated as one.
    pub max_attempts: u32,
    /// Wait before each retry.
    pub backoff: BackoffFn,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Arc::new(exponential_backoff),
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RetryConfig {
    /// Create a config with the given number of attempts and the default backoff.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// A single attempt, no retries.
    pub fn disabled() -> Self {
        Self::with_attempts(1)
    }

    /// Replace the backoff function.
    pub fn with_backoff(mut self, backoff: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Attempts actually made per call.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Calculate the delay for a given retry index (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }
}
