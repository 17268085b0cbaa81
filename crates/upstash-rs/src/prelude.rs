//! Convenience re-exports for the common client surface.
//!
//! ```ignore
//! use upstash_rs::prelude::*;
//! ```

pub use crate::batch::{Multi, Pipeline};
pub use crate::commands::{ScanOptions, ScanResult, SetOptions};
pub use crate::config::Options;
pub use crate::error::{Error, Result};
pub use crate::rest::envelope::{decode_base64, unwrap_item};
pub use crate::rest::{Request, RestClient, RetryConfig};
pub use crate::value::Value;
pub use crate::Upstash;
pub use tokio_util::sync::CancellationToken;
