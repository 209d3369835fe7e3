//! Partition routing module
//!
//! Supports: Parent records, static List values
//!
//! # Overview
//!
//! Partitions split one resource kind into many fetch jobs. This is useful for:
//! - Child resources that require a parent ID (pull requests per repository)
//! - Static list of values (issues per SonarQube component)

mod routers;
mod types;

pub use routers::{ListRouter, ParentRouter};
pub use types::{PartitionConfig, PartitionRouter};

use crate::error::{Error, Result};
use crate::types::StringMap;
use serde_json::Value;

/// Build the router a partition definition describes.
///
/// `parent_records` is only read by parent partitions; list partitions read
/// `from_var` out of `vars` as comma-separated values.
pub fn build_router(
    resource_kind: &str,
    config: &PartitionConfig,
    parent_records: Vec<Value>,
    vars: &StringMap,
) -> Result<Box<dyn PartitionRouter>> {
    config.validate()?;

    match config {
        PartitionConfig::Parent {
            id_path,
            disabled_path,
            param,
            ..
        } => {
            let mut router = ParentRouter::new(resource_kind, parent_records, id_path);
            if let Some(path) = disabled_path {
                router = router.with_disabled_path(path);
            }
            if let Some(param) = param {
                router = router.with_param(param);
            }
            Ok(Box::new(router))
        }
        PartitionConfig::List {
            param,
            values,
            from_var,
        } => {
            let mut values = values.clone();
            if let Some(var) = from_var {
                let raw = vars.get(var).ok_or_else(|| Error::undefined_var(format!("vars.{var}")))?;
                values.extend(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from),
                );
            }
            if values.is_empty() {
                return Err(Error::invalid_value(
                    "partition.values",
                    format!("no values for '{resource_kind}'"),
                ));
            }
            Ok(Box::new(ListRouter::new(resource_kind, param, values)))
        }
    }
}

#[cfg(test)]
mod tests;
