//! Built-in connector definitions embedded in the binary
//!
//! This module embeds all supported connector YAML files directly into the binary,
//! allowing users to use `-c bitbucket-cloud` instead of specifying a file path.
//! Each built-in also declares its closed set of resource kinds, checked
//! against its registry whenever it is loaded.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::ResourceRegistry;

// ============================================================================
// Resource kinds
// ============================================================================

crate::resource_kinds! {
    /// FireHydrant resource kinds
    pub enum FireHydrantKind {
        Environment => "environment",
        Incident => "incident",
        Service => "service",
        Team => "team",
        Retrospective => "retrospective",
    }
}

crate::resource_kinds! {
    /// Bitbucket Cloud resource kinds
    pub enum BitbucketKind {
        Project => "project",
        Repository => "repository",
        PullRequest => "pull_request",
    }
}

crate::resource_kinds! {
    /// Azure DevOps resource kinds
    pub enum AzureDevopsKind {
        Project => "project",
        Repository => "repository",
        PullRequest => "pull_request",
    }
}

crate::resource_kinds! {
    /// Statuspage resource kinds
    pub enum StatusPageKind {
        Page => "page",
        Component => "component",
        Incident => "incident",
    }
}

crate::resource_kinds! {
    /// SonarQube resource kinds
    pub enum SonarQubeKind {
        Project => "project",
        Issue => "issue",
    }
}

// ============================================================================
// Built-in registry
// ============================================================================

/// A connector shipped with the binary
#[derive(Clone, Copy)]
pub struct BuiltinConnector {
    /// Name accepted by `-c`
    pub name: &'static str,
    /// Short description for `list`
    pub description: &'static str,
    /// Embedded YAML definition
    pub yaml: &'static str,
    check_kinds: fn(&ResourceRegistry) -> Result<()>,
}

impl BuiltinConnector {
    /// Parse the definition and check it covers every declared kind
    pub fn load(&self) -> Result<EngineConfig> {
        let config = EngineConfig::from_yaml(self.yaml)?;
        (self.check_kinds)(&config.resources)?;
        Ok(config)
    }
}

impl std::fmt::Debug for BuiltinConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinConnector")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Every built-in connector, in listing order
pub static BUILTIN_CONNECTORS: &[BuiltinConnector] = &[
    BuiltinConnector {
        name: "azure-devops",
        description: "Azure DevOps projects, repositories, pull requests",
        yaml: include_str!("../connectors/azure-devops.yaml"),
        check_kinds: ResourceRegistry::validate_kinds::<AzureDevopsKind>,
    },
    BuiltinConnector {
        name: "bitbucket-cloud",
        description: "Bitbucket Cloud projects, repositories, pull requests",
        yaml: include_str!("../connectors/bitbucket-cloud.yaml"),
        check_kinds: ResourceRegistry::validate_kinds::<BitbucketKind>,
    },
    BuiltinConnector {
        name: "firehydrant",
        description: "FireHydrant environments, incidents, services, teams, retrospectives",
        yaml: include_str!("../connectors/firehydrant.yaml"),
        check_kinds: ResourceRegistry::validate_kinds::<FireHydrantKind>,
    },
    BuiltinConnector {
        name: "sonarqube",
        description: "SonarQube and SonarCloud projects, issues",
        yaml: include_str!("../connectors/sonarqube.yaml"),
        check_kinds: ResourceRegistry::validate_kinds::<SonarQubeKind>,
    },
    BuiltinConnector {
        name: "statuspage",
        description: "Atlassian Statuspage pages, components, incidents",
        yaml: include_str!("../connectors/statuspage.yaml"),
        check_kinds: ResourceRegistry::validate_kinds::<StatusPageKind>,
    },
];

/// Get a built-in connector by name
pub fn find_builtin(name: &str) -> Option<&'static BuiltinConnector> {
    BUILTIN_CONNECTORS.iter().find(|c| c.name == name)
}

/// Check if a connector name is a built-in connector
pub fn is_builtin(name: &str) -> bool {
    find_builtin(name).is_some()
}

/// List all built-in connector names
pub fn list_builtin() -> Vec<&'static str> {
    BUILTIN_CONNECTORS.iter().map(|c| c.name).collect()
}
