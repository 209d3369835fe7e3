//! Engine configuration
//!
//! One YAML document describes a source: where it lives, how to authenticate,
//! how politely to call it and how each resource kind is listed.

use crate::auth::{AuthConfig, Authenticator};
use crate::connectors;
use crate::engine::{Coordinator, CoordinatorConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::http::{FetcherConfig, PageFetcher, RateLimiter, RateLimiterConfig};
use crate::registry::{ResourceKind, ResourceRegistry};
use crate::template::{self, TemplateContext};
use crate::types::StringMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Top-Level Engine Config
// ============================================================================

/// Complete source configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Source name (e.g., "bitbucket-cloud")
    #[serde(default)]
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Base URL endpoint paths are joined to (may contain templates)
    pub base_url: String,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: StringMap,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Default run variables, overridden by `--var`
    #[serde(default)]
    pub vars: StringMap,

    /// Timeout and retry policy
    #[serde(default)]
    pub http: FetcherConfig,

    /// Per-host concurrency and throughput limits
    #[serde(default)]
    pub rate_limit: RateLimiterConfig,

    /// Job scheduling
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Resource kind → endpoint definitions
    pub resources: ResourceRegistry,
}

impl EngineConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse engine config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the whole configuration before any request is issued
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("base_url cannot be empty"));
        }
        template::check_roots(&self.base_url)?;

        if self.resources.is_empty() {
            return Err(Error::config("at least one resource must be defined"));
        }
        self.resources.validate()?;
        self.rate_limit.validate()?;

        if self.coordinator.max_concurrent == 0 {
            return Err(Error::invalid_value("coordinator.max_concurrent", "must be at least 1"));
        }
        if self.coordinator.channel_capacity == 0 {
            return Err(Error::invalid_value("coordinator.channel_capacity", "must be at least 1"));
        }
        if self.http.initial_backoff > self.http.max_backoff {
            return Err(Error::invalid_value(
                "http.initial_backoff_ms",
                "must not exceed max_backoff_ms",
            ));
        }
        Ok(())
    }

    /// Check that every kind of `K` has an endpoint
    pub fn validate_kinds<K: ResourceKind>(&self) -> Result<()> {
        self.resources.validate_kinds::<K>()
    }

    /// Defaults overlaid with run variables
    pub fn merged_vars(&self, overrides: &StringMap) -> StringMap {
        let mut vars = self.vars.clone();
        vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }

    /// Resolve the base URL, headers and credentials for a run
    pub fn source(&self, overrides: &StringMap) -> Result<SourceConfig> {
        let vars = self.merged_vars(overrides);
        let ctx = TemplateContext::with_vars(vars.clone());

        let credentials = Authenticator::new(self.auth.clone()).resolve(&ctx)?;
        let mut headers = template::render_map(&self.headers, &ctx)?;
        headers.extend(credentials.headers);

        Ok(SourceConfig {
            base_url: template::render(&self.base_url, &ctx)?,
            headers,
            query: credentials.query,
            vars,
        })
    }

    /// Build a coordinator that talks to the source over HTTP
    pub fn coordinator(&self, overrides: &StringMap) -> Result<Coordinator> {
        let fetcher = PageFetcher::with_reqwest(RateLimiter::new(self.rate_limit.clone()), self.http.clone())?;
        self.coordinator_with(Arc::new(fetcher), overrides)
    }

    /// Build a coordinator around an existing fetcher
    pub fn coordinator_with(&self, fetcher: Arc<PageFetcher>, overrides: &StringMap) -> Result<Coordinator> {
        let source = self.source(overrides)?;
        debug!(name = %self.name, base_url = %source.base_url, kinds = self.resources.len(), "Built coordinator");
        Ok(Coordinator::new(fetcher, Arc::new(self.resources.clone()), source)
            .with_config(self.coordinator.clone()))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load an engine config from a file path or a built-in connector name
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    // Bare names (no separators, no .yaml extension) are built-ins first
    if !path_str.contains('/')
        && !path_str.contains('\\')
        && !path_str.ends_with(".yaml")
        && !path_str.ends_with(".yml")
    {
        if let Some(builtin) = connectors::find_builtin(&path_str) {
            return builtin.load();
        }
    }

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!(
                "Config '{}' not found. Built-in connectors: {}. Or provide a path to a YAML file.",
                path.display(),
                connectors::list_builtin().join(", ")
            ))
        } else {
            Error::config(format!("Failed to read config file '{}': {e}", path.display()))
        }
    })?;

    EngineConfig::from_yaml(&content)
}
