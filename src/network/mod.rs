//! Live transport and adapter helpers
//!
//! [`HttpClient`] is a ready-made `compute` collaborator for
//! [`Store::fetch_async`](crate::store::Store::fetch_async). The `convert`
//! helpers translate `http` types into the fixture model and back.

mod client;
mod convert;

pub use client::HttpClient;
pub use convert::into_http_response;

/// Idle timeout for pooled connections
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Maximum idle connections kept per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;
