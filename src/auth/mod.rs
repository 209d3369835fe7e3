//! Authentication module
//!
//! Supports: API Key, Basic, Bearer, Custom Headers
//!
//! Every supported scheme is static for the lifetime of a run, so the
//! `Authenticator` resolves credentials once and the engine attaches them to
//! each request.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, Credentials, Location};

#[cfg(test)]
mod tests;
