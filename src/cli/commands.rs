//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fetchkit - concurrent paginated fetching from REST sources
#[derive(Parser, Debug)]
#[command(name = "fetchkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source config file (YAML) or built-in connector name
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Run variable as key=value (repeatable)
    #[arg(long = "var", value_parser = parse_key_val, global = true)]
    pub vars: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every item of a resource kind
    Run {
        /// Resource kind to fetch
        #[arg(short, long)]
        kind: String,

        /// Filter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,

        /// Maximum jobs in flight (defaults to the config)
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Cancel every job after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Stop after this many items
        #[arg(long)]
        max_records: Option<usize>,
    },

    /// Validate the source config
    Validate,

    /// List the resource kinds of the source config
    Kinds,

    /// List built-in connectors
    List,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse a `key=value` argument
pub(crate) fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
