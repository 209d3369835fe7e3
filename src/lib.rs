// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # fetchkit
//!
//! A Rust-native engine for pulling every item of a resource kind out of
//! paginated REST APIs, many jobs at a time.
//!
//! ## Features
//!
//! - **Fresh requests**: every page request is built from an immutable base
//!   query plus the current cursor; nothing leaks between calls
//! - **Cursor styles**: next URL, Link header, opaque token, offset, page number
//! - **Retries**: transient failures retried with capped backoff and jitter
//! - **Per-host limits**: bounded in-flight requests and optional token bucket
//! - **Coordinated runs**: N jobs at a time, merged into one lazy stream
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fetchkit::{load_config, request::BaseQuery, Result};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("bitbucket-cloud")?;
//!     let vars = [("workspace".to_string(), "acme".to_string())].into_iter().collect();
//!     let coordinator = config.coordinator(&vars)?;
//!
//!     let jobs = coordinator.plan("pull_request", &BaseQuery::empty()).await?;
//!     let mut stream = coordinator.run(jobs, 4);
//!     while let Some(batch) = stream.next().await {
//!         let batch = batch?;
//!         println!("{} items from {}", batch.len(), batch.job_id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Coordinator (N jobs at a time)                 │
//! │  plan(kind) → Vec<FetchJob>    run(jobs, n) → BatchStream       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Registry │ Partition │   Paginator   │  Fetcher  │ RateLimiter │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Kinds    │ Parent    │ Next URL      │ Retry     │ Per host    │
//! │ Endpoints│ List      │ Token         │ Backoff   │ Leases      │
//! │ Templates│           │ Offset / Page │ Timeout   │ Throughput  │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for fetchkit
pub mod error;

/// Common types and type aliases
pub mod types;

/// Request construction from base query and cursor
pub mod request;

/// Cursor styles, page extraction and the paginator
pub mod pagination;

/// Transport, per-host rate limiting and the page fetcher
pub mod http;

/// Job coordination
pub mod engine;

/// Resource kinds and endpoint definitions
pub mod registry;

/// Partition routing
pub mod partition;

/// Authentication
pub mod auth;

/// Template interpolation
pub mod template;

/// Source configuration
pub mod config;

/// Built-in connector definitions
pub mod connectors;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{load_config, EngineConfig};
pub use engine::{Batch, BatchStream, Coordinator, FetchJob, RunStats};
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
