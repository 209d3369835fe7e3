//! HTTP module
//!
//! Provides the page fetcher with retry, per-host rate limiting, and backoff
//! strategies.
//!
//! # Features
//!
//! - **Leases**: every attempt holds a per-host slot, released on every exit path
//! - **Automatic Retries**: transient failures retried with capped backoff and jitter
//! - **Rate Limiting**: semaphore concurrency gate plus optional governor quota
//! - **Pluggable Transport**: reqwest in production, scripted transports in tests

mod fetcher;
mod rate_limit;
mod transport;

pub use fetcher::{FetcherConfig, PageFetcher};
pub use rate_limit::{Lease, RateLimiter, RateLimiterConfig};
pub use transport::{RawResponse, ReqwestTransport, Transport};

#[cfg(test)]
pub(crate) mod testing;
