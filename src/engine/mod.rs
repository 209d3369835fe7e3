//! Execution engine module
//!
//! Runs many fetch jobs under a bounded worker pool and merges their batches.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Coordinator` - schedules one paginator per job, at most N at a time
//! - `BatchStream` - the lazy merged output, cancelled when dropped
//! - `FetchJob`, `Batch`, `RunStats` - inputs, outputs and run accounting
//!
//! Within one job batches keep page order; across jobs they interleave. A
//! failing job never stops its siblings unless fail-fast is configured; every
//! failure is reported once, at the end, in a single `JobsFailed` error.

mod planner;
mod stream;
mod types;

pub use stream::BatchStream;
pub use types::{
    Batch, CoordinatorConfig, FetchJob, ParentContext, RunOutput, RunStats, SourceConfig,
};

use crate::error::{Error, JobFailure, Result};
use crate::http::PageFetcher;
use crate::pagination::Paginator;
use crate::registry::ResourceRegistry;
use crate::request::{BaseQuery, RequestBuilder};
use crate::template::{self, TemplateContext};
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use types::{JobEnd, JobReport};

/// Runs fetch jobs against one source
#[derive(Clone)]
pub struct Coordinator {
    fetcher: Arc<PageFetcher>,
    registry: Arc<ResourceRegistry>,
    source: Arc<SourceConfig>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Create a coordinator
    pub fn new(fetcher: Arc<PageFetcher>, registry: Arc<ResourceRegistry>, source: SourceConfig) -> Self {
        Self {
            fetcher,
            registry,
            source: Arc::new(source),
            config: CoordinatorConfig::default(),
        }
    }

    /// Set coordinator configuration
    #[must_use]
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Coordinator configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The shared page fetcher
    pub fn fetcher(&self) -> &Arc<PageFetcher> {
        &self.fetcher
    }

    /// The resource registry
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Run jobs with at most `max_concurrent` paginators active at once.
    ///
    /// Nothing is fetched until the returned stream is first polled.
    pub fn run(&self, jobs: Vec<FetchJob>, max_concurrent: usize) -> BatchStream {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (stats_tx, stats_rx) = watch::channel(RunStats::default());
        let cancel = CancellationToken::new();

        let driver = self
            .clone()
            .drive(jobs, max_concurrent.max(1), tx, cancel.clone(), stats_tx)
            .boxed();

        BatchStream::new(rx, driver, cancel, stats_rx)
    }

    /// Run jobs with the configured concurrency and collect everything
    pub async fn run_all(&self, jobs: Vec<FetchJob>) -> RunOutput {
        self.run(jobs, self.config.max_concurrent).drain().await
    }

    /// Build the paginator for a job. Fails before any request is issued if
    /// the kind is unknown or the endpoint cannot be rendered.
    pub fn paginator_for(&self, job: &FetchJob) -> Result<Paginator> {
        let endpoint = self.registry.endpoint(&job.resource_kind)?;

        let mut ctx = TemplateContext::with_vars(self.source.vars.clone());
        if let Some(parent) = &job.parent {
            ctx = ctx.with_parent(parent.record.clone());
        }

        let path = template::render(&endpoint.path, &ctx)?;
        let url = self.source.url_for(&path);
        let fixed = BaseQuery::from(template::render_map(&endpoint.base_query.to_params(), &ctx)?);
        let base = fixed.merged_with(&job.base_query);

        let mut headers = self.source.headers.clone();
        headers.extend(template::render_map(&endpoint.headers, &ctx)?);

        let builder = RequestBuilder::new(url, endpoint.method, base)
            .with_auth_query(self.source.query.clone())
            .with_headers(headers);
        Ok(Paginator::new(Arc::clone(&self.fetcher), builder, endpoint.pagination.clone())?
            .with_label(job.id.clone()))
    }

    async fn drive(
        self,
        jobs: Vec<FetchJob>,
        max_concurrent: usize,
        tx: mpsc::Sender<Result<Batch>>,
        cancel: CancellationToken,
        stats_tx: watch::Sender<RunStats>,
    ) {
        let mut stats = RunStats {
            jobs_total: jobs.len(),
            ..Default::default()
        };

        let mut queue = VecDeque::with_capacity(jobs.len());
        for job in jobs {
            if job.is_eligible() {
                queue.push_back(job);
            } else {
                debug!(job = %job.id, kind = %job.resource_kind, "Skipping job with disabled parent");
                stats.skipped += 1;
            }
        }

        let mut running = JoinSet::new();
        let mut identities: HashMap<task::Id, (String, String)> = HashMap::new();
        let mut failures = Vec::new();

        loop {
            while running.len() < max_concurrent && !cancel.is_cancelled() {
                let Some(job) = queue.pop_front() else {
                    break;
                };

                match self.paginator_for(&job) {
                    Ok(paginator) => {
                        debug!(job = %job.id, kind = %job.resource_kind, "Starting job");
                        let identity = (job.id.clone(), job.resource_kind.clone());
                        let task = run_job(job, paginator, tx.clone(), cancel.clone());
                        let handle = running.spawn(AssertUnwindSafe(task).catch_unwind());
                        identities.insert(handle.id(), identity);
                    }
                    Err(e) => {
                        warn!(job = %job.id, kind = %job.resource_kind, error = %e, "Job rejected");
                        stats.failed += 1;
                        failures.push(JobFailure::new(job.id, job.resource_kind, e));
                        if self.config.fail_fast {
                            cancel.cancel();
                        }
                    }
                }
            }

            let Some(joined) = running.join_next_with_id().await else {
                break;
            };
            let task_id = match &joined {
                Ok((id, _)) => *id,
                Err(e) => e.id(),
            };
            let (job_id, kind) = identities
                .remove(&task_id)
                .unwrap_or_else(|| ("<unknown>".to_string(), "<unknown>".to_string()));

            match joined.map(|(_, outcome)| outcome) {
                Ok(Ok(report)) => {
                    stats.pages += report.pages;
                    stats.batches += report.batches;
                    stats.records += report.records;
                    match report.end {
                        JobEnd::Completed => stats.completed += 1,
                        JobEnd::Cancelled => stats.cancelled += 1,
                        JobEnd::Failed(e) => {
                            warn!(job = %report.job_id, kind = %report.resource_kind, error = %e, "Job failed");
                            stats.failed += 1;
                            failures.push(JobFailure::new(report.job_id, report.resource_kind, e));
                            if self.config.fail_fast {
                                cancel.cancel();
                            }
                        }
                    }
                }
                Ok(Err(panic)) => {
                    let message = panic_message(panic.as_ref());
                    warn!(job = %job_id, kind = %kind, panic = %message, "Job task panicked");
                    stats.failed += 1;
                    failures.push(JobFailure::new(
                        job_id,
                        kind,
                        Error::Other(format!("job task panicked: {message}")),
                    ));
                    if self.config.fail_fast {
                        cancel.cancel();
                    }
                }
                Err(e) => {
                    warn!(job = %job_id, kind = %kind, error = %e, "Job task aborted");
                    stats.cancelled += 1;
                }
            }
            stats_tx.send_replace(stats.clone());
        }

        stats.cancelled += queue.len();
        stats_tx.send_replace(stats.clone());
        info!(
            jobs = stats.jobs_total,
            completed = stats.completed,
            failed = stats.failed,
            skipped = stats.skipped,
            cancelled = stats.cancelled,
            batches = stats.batches,
            records = stats.records,
            pages = stats.pages,
            "Run finished"
        );

        if !failures.is_empty() {
            let error = Error::JobsFailed {
                failures,
                cancelled: stats.cancelled,
            };
            if tx.send(Err(error)).await.is_err() {
                debug!("Consumer gone before the failure report was delivered");
            }
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("base_url", &self.source.base_url)
            .field("kinds", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

/// Drive one paginator to a terminal state, forwarding its batches
async fn run_job(
    job: FetchJob,
    mut paginator: Paginator,
    tx: mpsc::Sender<Result<Batch>>,
    cancel: CancellationToken,
) -> JobReport {
    let mut report = JobReport::new(&job);
    let parent_id = job.parent.as_ref().map(|parent| parent.id.clone());

    let end = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break JobEnd::Cancelled,
            next = paginator.next_batch() => next,
        };

        let items = match next {
            None => break JobEnd::Completed,
            Some(Err(e)) => break JobEnd::Failed(e),
            Some(Ok(items)) => items,
        };

        let count = items.len() as u64;
        let batch = Batch {
            job_id: job.id.clone(),
            resource_kind: job.resource_kind.clone(),
            parent_id: parent_id.clone(),
            page: report.batches + 1,
            items,
        };

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            sent = tx.send(Ok(batch)) => sent.is_ok(),
        };
        if !sent {
            break JobEnd::Cancelled;
        }
        report.batches += 1;
        report.records += count;
    };

    report.pages = paginator.state().pages_fetched;
    debug!(job = %job.id, pages = report.pages, records = report.records, "Job finished");
    report.ended(end)
}
