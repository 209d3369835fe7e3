//! CLI module
//!
//! Command-line interface for running sources.
//!
//! # Commands
//!
//! - `run` - Fetch a resource kind, one JSON line per item
//! - `validate` - Check a source config
//! - `kinds` - List resource kinds of a source
//! - `list` - List built-in connectors

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
