//! Registry types

use crate::error::{Error, Result};
use crate::pagination::PaginationConfig;
use crate::partition::PartitionConfig;
use crate::request::BaseQuery;
use crate::template;
use crate::types::{Method, StringMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Resource kinds
// ============================================================================

/// A closed set of resource kinds a connector can fetch
pub trait ResourceKind: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every kind in the set
    const ALL: &'static [Self];

    /// Registry identifier of this kind
    fn as_str(&self) -> &'static str;

    /// Look up a kind by identifier
    fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == id)
    }
}

/// Declare a closed resource kind enum and its registry identifiers.
///
/// ```
/// fetchkit::resource_kinds! {
///     /// Kinds exposed by the tracker
///     pub enum TrackerKind {
///         Issue => "issue",
///         Project => "project",
///     }
/// }
///
/// use fetchkit::registry::ResourceKind;
/// assert_eq!(TrackerKind::Issue.as_str(), "issue");
/// assert_eq!("project".parse::<TrackerKind>().unwrap(), TrackerKind::Project);
/// ```
#[macro_export]
macro_rules! resource_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $id:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::registry::ResourceKind for $name {
            const ALL: &'static [Self] = &[ $( Self::$variant ),+ ];

            fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $id ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::registry::ResourceKind::as_str(self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                <Self as $crate::registry::ResourceKind>::from_id(s).ok_or_else(|| {
                    $crate::Error::UnknownResourceKind {
                        kind: s.to_string(),
                    }
                })
            }
        }
    };
}

// ============================================================================
// Endpoint
// ============================================================================

/// How to list one resource kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Path relative to the source base URL (may contain templates)
    pub path: String,
    /// HTTP method
    #[serde(default)]
    pub method: Method,
    /// Filters sent with every request for this kind
    #[serde(default, rename = "query")]
    pub base_query: BaseQuery,
    /// Extra headers for this kind
    #[serde(default)]
    pub headers: StringMap,
    /// How jobs for this kind are derived; absent means a single job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionConfig>,
    /// Items path, cursor style and limits
    #[serde(flatten)]
    pub pagination: PaginationConfig,
}

impl Endpoint {
    /// Create an endpoint
    pub fn new(path: impl Into<String>, pagination: PaginationConfig) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            base_query: BaseQuery::empty(),
            headers: StringMap::new(),
            partition: None,
            pagination,
        }
    }

    /// Set the HTTP method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the endpoint's fixed filters
    #[must_use]
    pub fn with_query(mut self, query: BaseQuery) -> Self {
        self.base_query = query;
        self
    }

    /// Derive jobs through a partition
    #[must_use]
    pub fn with_partition(mut self, partition: PartitionConfig) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Check the endpoint definition
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(Error::invalid_value("path", "must not be empty"));
        }
        template::check_roots(&self.path)?;
        if let Some(partition) = &self.partition {
            partition.validate()?;
        }
        self.pagination.validate(&self.base_query)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Resource kind → endpoint definitions for one source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRegistry {
    endpoints: BTreeMap<String, Endpoint>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint for a kind
    #[must_use]
    pub fn with_endpoint(mut self, kind: impl Into<String>, endpoint: Endpoint) -> Self {
        self.endpoints.insert(kind.into(), endpoint);
        self
    }

    /// Endpoint for a kind
    pub fn endpoint(&self, kind: &str) -> Result<&Endpoint> {
        self.endpoints
            .get(kind)
            .ok_or_else(|| Error::UnknownResourceKind {
                kind: kind.to_string(),
            })
    }

    /// Registered kinds in name order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// Iterate over kinds and endpoints
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Endpoint)> {
        self.endpoints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Check if no kinds are registered
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Validate every endpoint definition
    pub fn validate(&self) -> Result<()> {
        for (kind, endpoint) in &self.endpoints {
            endpoint.validate().map_err(|e| {
                Error::config(format!("resource '{kind}': {e}"))
            })?;
            self.lineage(kind)?;
        }
        Ok(())
    }

    /// Kinds a partitioned kind depends on, parents first.
    ///
    /// Fails on an unknown parent or a cycle.
    pub fn lineage(&self, kind: &str) -> Result<Vec<&str>> {
        let mut chain = Vec::new();
        let mut current = self.endpoint(kind)?;
        while let Some(parent) = current.partition.as_ref().and_then(PartitionConfig::parent_kind) {
            if parent == kind || chain.contains(&parent) {
                return Err(Error::config(format!("resource '{kind}': partition cycle through '{parent}'")));
            }
            current = self.endpoint(parent)?;
            chain.push(parent);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Check that every kind of `K` has an endpoint
    pub fn validate_kinds<K: ResourceKind>(&self) -> Result<()> {
        let missing: Vec<&str> = K::ALL
            .iter()
            .map(K::as_str)
            .filter(|id| !self.endpoints.contains_key(*id))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::config(format!(
                "no endpoint registered for resource kind(s): {}",
                missing.join(", ")
            )))
        }
    }
}
