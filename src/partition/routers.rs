//! Partition router implementations
//!
//! Each router handles a specific partitioning strategy.

use super::types::PartitionRouter;
use crate::engine::{FetchJob, ParentContext};
use crate::error::Result;
use crate::pagination::lookup_path;
use crate::request::BaseQuery;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

// ============================================================================
// List Router
// ============================================================================

/// List-based partition router
///
/// Creates one job per static value, passing the value as a query parameter
/// (e.g., one SonarQube issue search per component key).
#[derive(Debug, Clone)]
pub struct ListRouter {
    resource_kind: String,
    param: String,
    values: Vec<String>,
}

impl ListRouter {
    /// Create a new list router
    pub fn new(resource_kind: impl Into<String>, param: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            param: param.into(),
            values,
        }
    }
}

impl PartitionRouter for ListRouter {
    fn jobs(&self) -> Result<Vec<FetchJob>> {
        let mut seen = HashSet::new();
        Ok(self
            .values
            .iter()
            .filter(|value| seen.insert(value.as_str()))
            .map(|value| {
                FetchJob::new(format!("{}/{value}", self.resource_kind), &self.resource_kind)
                    .with_query(BaseQuery::empty().with(&self.param, value))
            })
            .collect())
    }

    fn resource_kind(&self) -> &str {
        &self.resource_kind
    }
}

// ============================================================================
// Parent Router
// ============================================================================

/// Parent record-based partition router
///
/// Creates one child job per parent record. Parents whose disabled flag is
/// set still produce a job, marked ineligible, so the coordinator accounts
/// for it as skipped without fetching.
#[derive(Debug, Clone)]
pub struct ParentRouter {
    resource_kind: String,
    records: Vec<Value>,
    id_path: String,
    disabled_path: Option<String>,
    param: Option<String>,
}

impl ParentRouter {
    /// Create a new parent router
    pub fn new(resource_kind: impl Into<String>, records: Vec<Value>, id_path: impl Into<String>) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            records,
            id_path: id_path.into(),
            disabled_path: None,
            param: None,
        }
    }

    /// Read a disabled flag from each parent (e.g., `isDisabled`)
    #[must_use]
    pub fn with_disabled_path(mut self, path: impl Into<String>) -> Self {
        self.disabled_path = Some(path.into());
        self
    }

    /// Pass the parent identifier as a query parameter
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    fn extract_id(&self, record: &Value) -> Option<String> {
        match lookup_path(record, &self.id_path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn is_disabled(&self, record: &Value) -> bool {
        self.disabled_path
            .as_deref()
            .and_then(|path| lookup_path(record, path))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl PartitionRouter for ParentRouter {
    fn jobs(&self) -> Result<Vec<FetchJob>> {
        let mut jobs = Vec::new();
        let mut seen = HashSet::new();

        for record in &self.records {
            let Some(id) = self.extract_id(record) else {
                warn!(kind = %self.resource_kind, id_path = %self.id_path, "Parent record has no id, skipping");
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }

            let query = match &self.param {
                Some(param) => BaseQuery::empty().with(param, &id),
                None => BaseQuery::empty(),
            };
            let parent = ParentContext::new(&id, record.clone()).disabled(self.is_disabled(record));
            jobs.push(
                FetchJob::new(format!("{}/{id}", self.resource_kind), &self.resource_kind)
                    .with_query(query)
                    .with_parent(parent),
            );
        }

        Ok(jobs)
    }

    fn resource_kind(&self) -> &str {
        &self.resource_kind
    }
}
