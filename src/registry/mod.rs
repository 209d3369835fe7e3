//! Resource registry
//!
//! Maps resource kinds ("pull_request", "incident", ...) to endpoint
//! definitions. Kind sets are closed enums declared with
//! [`resource_kinds!`](crate::resource_kinds) and checked against the
//! registry at startup, so a missing endpoint is a configuration error rather
//! than a runtime lookup failure halfway through a run.

mod types;

pub use types::{Endpoint, ResourceKind, ResourceRegistry};

#[cfg(test)]
mod tests;
