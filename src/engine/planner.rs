//! Job planning
//!
//! Expands a resource kind into the fetch jobs that cover it. Partitioned
//! kinds pull their parents first, one level at a time.

use super::{Coordinator, FetchJob};
use crate::error::Result;
use crate::partition::build_router;
use crate::request::BaseQuery;
use tracing::{debug, info};

impl Coordinator {
    /// Plan the jobs for `kind`, fetching every ancestor kind it partitions
    /// over. `query` applies to the final jobs only.
    pub async fn plan(&self, kind: &str, query: &BaseQuery) -> Result<Vec<FetchJob>> {
        let mut levels = self.registry.lineage(kind)?;
        levels.push(kind);

        let mut jobs: Vec<FetchJob> = Vec::new();
        for (depth, level) in levels.iter().copied().enumerate() {
            let records = if depth == 0 {
                Vec::new()
            } else {
                let output = self.run_all(std::mem::take(&mut jobs)).await;
                if let Some(error) = output.error {
                    return Err(error);
                }
                let records: Vec<_> = output.items().cloned().collect();
                info!(kind = %levels[depth - 1], records = records.len(), "Fetched parent records");
                records
            };

            jobs = self.jobs_for_level(level, records)?;
            debug!(kind = %level, jobs = jobs.len(), "Planned jobs");
        }

        Ok(jobs
            .into_iter()
            .map(|job| {
                let merged = job.base_query.merged_with(query);
                job.with_query(merged)
            })
            .collect())
    }

    fn jobs_for_level(&self, kind: &str, parent_records: Vec<serde_json::Value>) -> Result<Vec<FetchJob>> {
        let endpoint = self.registry.endpoint(kind)?;
        match &endpoint.partition {
            Some(partition) => build_router(kind, partition, parent_records, &self.source.vars)?.jobs(),
            None => Ok(vec![FetchJob::new(kind, kind)]),
        }
    }
}
