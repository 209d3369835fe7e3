//! Page request module
//!
//! Builds one immutable [`PageRequest`] per page from a job's immutable
//! [`BaseQuery`] and the current pagination state.
//!
//! # Overview
//!
//! Every call to [`RequestBuilder::build`] allocates a fresh parameter
//! mapping: it starts empty, copies the base query, then overlays the
//! cursor-specific keys for the page being requested. Nothing built for one
//! page is ever reused for the next one, or shared with another job.

mod builder;
mod types;

pub use builder::RequestBuilder;
pub use types::{BaseQuery, PageRequest};

#[cfg(test)]
mod tests;
