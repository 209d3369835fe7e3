//! Engine types
//!
//! Jobs, batches, coordinator configuration and run statistics.

use crate::error::Error;
use crate::registry::ResourceKind;
use crate::request::BaseQuery;
use crate::types::StringMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The parent record a child job was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct ParentContext {
    /// Parent identifier
    pub id: String,
    /// Full parent record, available to `{{ parent.* }}` templates
    pub record: Value,
    /// The parent is disabled; the child job is skipped
    pub disabled: bool,
}

impl ParentContext {
    /// Create a parent context
    pub fn new(id: impl Into<String>, record: Value) -> Self {
        Self {
            id: id.into(),
            record,
            disabled: false,
        }
    }

    /// Mark the parent as disabled
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// One unit of work: fetch every page of one resource kind for one base query
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJob {
    /// Job identifier, unique within a run
    pub id: String,
    /// Registry identifier of the resource kind
    pub resource_kind: String,
    /// Job-specific filters, merged over the endpoint's fixed query
    pub base_query: BaseQuery,
    /// Parent record for child jobs
    pub parent: Option<ParentContext>,
}

impl FetchJob {
    /// Create a job with no filters
    pub fn new(id: impl Into<String>, resource_kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_kind: resource_kind.into(),
            base_query: BaseQuery::empty(),
            parent: None,
        }
    }

    /// Create a job for a typed resource kind
    pub fn for_kind<K: ResourceKind>(id: impl Into<String>, kind: K) -> Self {
        Self::new(id, kind.as_str())
    }

    /// Set the job's filters
    #[must_use]
    pub fn with_query(mut self, query: BaseQuery) -> Self {
        self.base_query = query;
        self
    }

    /// Set the parent record
    #[must_use]
    pub fn with_parent(mut self, parent: ParentContext) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Whether the coordinator should run this job at all
    pub fn is_eligible(&self) -> bool {
        self.parent.as_ref().map_or(true, |parent| !parent.disabled)
    }
}

/// A non-empty page of items from one job
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Job that produced the batch
    pub job_id: String,
    /// Resource kind of the items
    pub resource_kind: String,
    /// Parent identifier for child jobs
    pub parent_id: Option<String>,
    /// 1-based batch number within the job
    pub page: u64,
    /// Items in upstream order
    pub items: Vec<Value>,
}

impl Batch {
    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the batch has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Coordinator scheduling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Jobs running at once
    pub max_concurrent: usize,
    /// Cancel every sibling on the first job failure
    pub fail_fast: bool,
    /// Batches buffered ahead of the consumer
    pub channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            fail_fast: false,
            channel_capacity: 32,
        }
    }
}

impl CoordinatorConfig {
    /// Set the job concurrency
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Enable or disable fail-fast
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set the batch buffer size
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Where endpoint paths are resolved and which headers every request carries
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    /// Base URL endpoint paths are joined to
    pub base_url: String,
    /// Headers for every request, auth included
    pub headers: StringMap,
    /// Query parameters for every request, overridden by endpoint and job filters
    pub query: BaseQuery,
    /// Run variables for `{{ vars.* }}`
    pub vars: StringMap,
}

impl SourceConfig {
    /// Create a source for a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the query parameters every request carries
    #[must_use]
    pub fn with_query(mut self, query: BaseQuery) -> Self {
        self.query = query;
        self
    }

    /// Add a run variable
    #[must_use]
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Join an endpoint path to the base URL
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Statistics from a coordinator run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Jobs submitted
    pub jobs_total: usize,
    /// Jobs that reached `Done`
    pub completed: usize,
    /// Jobs that reached `Failed`
    pub failed: usize,
    /// Ineligible jobs never started
    pub skipped: usize,
    /// Jobs stopped or never started because of cancellation
    pub cancelled: usize,
    /// Batches delivered
    pub batches: u64,
    /// Items delivered
    pub records: u64,
    /// Pages fetched
    pub pages: u64,
}

impl RunStats {
    /// Check if any job failed
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// How a job task ended
#[derive(Debug)]
pub(crate) enum JobEnd {
    Completed,
    Failed(Error),
    Cancelled,
}

/// What a job task reports back to the driver
#[derive(Debug)]
pub(crate) struct JobReport {
    pub job_id: String,
    pub resource_kind: String,
    pub pages: u64,
    pub batches: u64,
    pub records: u64,
    pub end: JobEnd,
}

impl JobReport {
    pub(crate) fn new(job: &FetchJob) -> Self {
        Self {
            job_id: job.id.clone(),
            resource_kind: job.resource_kind.clone(),
            pages: 0,
            batches: 0,
            records: 0,
            end: JobEnd::Completed,
        }
    }

    #[must_use]
    pub(crate) fn ended(mut self, end: JobEnd) -> Self {
        self.end = end;
        self
    }
}

/// Everything a drained run produced
#[derive(Debug)]
pub struct RunOutput {
    /// Every delivered batch, in delivery order
    pub batches: Vec<Batch>,
    /// The aggregated failure, if any job failed
    pub error: Option<Error>,
    /// Final statistics
    pub stats: RunStats,
}

impl RunOutput {
    /// All items across batches, in delivery order
    pub fn items(&self) -> impl Iterator<Item = &Value> {
        self.batches.iter().flat_map(|batch| batch.items.iter())
    }

    /// Items delivered by one job, in page order
    pub fn items_for(&self, job_id: &str) -> Vec<Value> {
        self.batches
            .iter()
            .filter(|batch| batch.job_id == job_id)
            .flat_map(|batch| batch.items.iter().cloned())
            .collect()
    }
}
