//! Typed command wrappers on [`Upstash`](crate::Upstash).
//!
//! Each wrapper marshals its arguments into `[COMMAND, args...]`, issues it
//! through the transport, and narrows the decoded [`Value`](crate::Value) to
//! a concrete type. An unexpected shape surfaces as
//! [`Error::TypeMismatch`](crate::Error::TypeMismatch).
//!
//! Commands without a wrapper are available through
//! [`Upstash::send`](crate::Upstash::send).

mod generic;
mod hashes;
mod lists;
mod pubsub;
mod sets;
mod strings;

pub use generic::{ScanOptions, ScanResult};
pub use strings::SetOptions;

/// `[first, rest...]` as JSON arguments.
fn with_key(first: &str, rest: &[&str]) -> Vec<serde_json::Value> {
    std::iter::once(first)
        .chain(rest.iter().copied())
        .map(serde_json::Value::from)
        .collect()
}
