//! Error types for fetchkit
//!
//! This module defines the error hierarchy for the whole engine.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::fmt;
use thiserror::Error;

/// The main error type for fetchkit
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Unknown resource kind: {kind}")]
    UnknownResourceKind { kind: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Per-attempt HTTP Errors (classified by `is_retryable`)
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Upstream Errors (surfaced to the paginator)
    // ============================================================================
    #[error("Transient upstream failure after {attempts} attempts: {message}")]
    TransientUpstream { attempts: u32, message: String },

    #[error("Upstream rejected request with HTTP {status}: {body}")]
    PermanentUpstream { status: u16, body: String },

    #[error("Malformed response: {message} (payload shape: {shape})")]
    MalformedResponse { message: String, shape: String },

    // ============================================================================
    // Rate Limiting Errors
    // ============================================================================
    #[error("Timed out after {timeout_ms}ms waiting for a rate limit slot on '{host}'")]
    RateLimitTimeout { host: String, timeout_ms: u64 },

    #[error("Rate limit lease for '{host}' was released twice")]
    LeaseAlreadyReleased { host: String },

    // ============================================================================
    // Coordination Errors
    // ============================================================================
    #[error("Job cancelled")]
    Cancelled,

    #[error("{} job(s) failed ({cancelled} cancelled): {}", .failures.len(), JobFailure::join(.failures))]
    JobsFailed {
        failures: Vec<JobFailure>,
        cancelled: usize,
    },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// A single failed job inside an aggregated [`Error::JobsFailed`]
#[derive(Debug)]
pub struct JobFailure {
    /// Job identifier
    pub job_id: String,
    /// Resource kind the job was fetching
    pub resource_kind: String,
    /// Why the job stopped
    pub error: Error,
}

impl JobFailure {
    /// Create a job failure record
    pub fn new(job_id: impl Into<String>, resource_kind: impl Into<String>, error: Error) -> Self {
        Self {
            job_id: job_id.into(),
            resource_kind: resource_kind.into(),
            error,
        }
    }

    fn join(failures: &[JobFailure]) -> String {
        failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.job_id, self.resource_kind, self.error)
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>, shape: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            shape: shape.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Connection { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error is a configuration problem
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::InvalidConfigValue { .. }
                | Error::UnknownResourceKind { .. }
                | Error::UndefinedVariable { .. }
                | Error::Template { .. }
        )
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Result type alias for fetchkit
pub type Result<T> = std::result::Result<T, Error>;
