//! Partition types and traits
//!
//! Defines how one resource kind is split into many fetch jobs.

use crate::engine::FetchJob;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Trait for partition routers
pub trait PartitionRouter: Send + Sync {
    /// Build one fetch job per partition
    fn jobs(&self) -> Result<Vec<FetchJob>>;

    /// Resource kind every job fetches
    fn resource_kind(&self) -> &str;
}

/// How jobs for a resource kind are derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartitionConfig {
    /// One job per record of a parent resource kind
    Parent {
        /// Parent resource kind
        kind: String,
        /// Path to the parent identifier
        #[serde(default = "default_id_path")]
        id_path: String,
        /// Path to a boolean that marks the parent disabled
        #[serde(default)]
        disabled_path: Option<String>,
        /// Query parameter that receives the parent identifier
        #[serde(default)]
        param: Option<String>,
    },

    /// One job per static value
    List {
        /// Query parameter that receives the value
        param: String,
        /// Values, or empty to read them from `from_var`
        #[serde(default)]
        values: Vec<String>,
        /// Run variable holding comma-separated values
        #[serde(default)]
        from_var: Option<String>,
    },
}

fn default_id_path() -> String {
    "id".to_string()
}

impl PartitionConfig {
    /// Parent resource kind, if any
    pub fn parent_kind(&self) -> Option<&str> {
        match self {
            Self::Parent { kind, .. } => Some(kind),
            Self::List { .. } => None,
        }
    }

    /// Check the partition definition
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Parent { kind, id_path, .. } => {
                if kind.is_empty() {
                    return Err(Error::invalid_value("partition.kind", "must not be empty"));
                }
                if id_path.is_empty() {
                    return Err(Error::invalid_value("partition.id_path", "must not be empty"));
                }
                Ok(())
            }
            Self::List {
                param,
                values,
                from_var,
            } => {
                if param.is_empty() {
                    return Err(Error::invalid_value("partition.param", "must not be empty"));
                }
                if values.is_empty() && from_var.is_none() {
                    return Err(Error::invalid_value(
                        "partition.values",
                        "a list partition needs values or from_var",
                    ));
                }
                Ok(())
            }
        }
    }
}
