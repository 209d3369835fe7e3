//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, EngineConfig};
use crate::connectors::BUILTIN_CONNECTORS;
use crate::engine::{Batch, RunStats};
use crate::error::{Error, Result};
use crate::partition::PartitionConfig;
use crate::request::BaseQuery;
use crate::types::StringMap;
use futures::StreamExt;
use serde_json::{json, Value};
use std::io::Write;
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command, writing to stdout
    pub async fn run(&self) -> Result<()> {
        let mut out = std::io::BufWriter::new(std::io::stdout());
        let result = self.run_with(&mut out).await;
        out.flush()?;
        result
    }

    /// Run the CLI command, writing to `out`
    pub async fn run_with<W: Write>(&self, out: &mut W) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                kind,
                query,
                max_concurrent,
                fail_fast,
                max_records,
            } => {
                let query: BaseQuery = query.iter().cloned().collect();
                self.fetch(out, kind, &query, *max_concurrent, *fail_fast, *max_records)
                    .await
            }
            Commands::Validate => self.validate(out),
            Commands::Kinds => self.kinds(out),
            Commands::List => self.list_connectors(out),
        }
    }

    /// Load the source config
    fn load_config(&self) -> Result<EngineConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Source config not specified (use -c flag)"))?;
        load_config(path)
    }

    fn vars(&self) -> StringMap {
        self.cli.vars.iter().cloned().collect()
    }

    /// Fetch every item of a kind as JSON lines
    async fn fetch<W: Write>(
        &self,
        out: &mut W,
        kind: &str,
        query: &BaseQuery,
        max_concurrent: Option<usize>,
        fail_fast: bool,
        max_records: Option<usize>,
    ) -> Result<()> {
        let mut config = self.load_config()?;
        if fail_fast {
            config.coordinator.fail_fast = true;
        }
        let coordinator = config.coordinator(&self.vars())?;
        let started = Instant::now();

        let jobs = coordinator.plan(kind, query).await?;
        let max_concurrent = max_concurrent.unwrap_or(coordinator.config().max_concurrent);
        info!(kind, jobs = jobs.len(), max_concurrent, "Starting run");

        let mut stream = coordinator.run(jobs, max_concurrent);
        let mut emitted = 0usize;
        let mut failure = None;

        while let Some(next) = stream.next().await {
            match next {
                Ok(batch) => {
                    let remaining = max_records.map(|max| max.saturating_sub(emitted));
                    emitted += write_batch(out, &batch, remaining)?;
                    if max_records.is_some_and(|max| emitted >= max) {
                        info!(records = emitted, "Record limit reached, cancelling run");
                        break;
                    }
                }
                Err(e) => failure = Some(e),
            }
        }

        let stats = if failure.is_none() && max_records.is_some_and(|max| emitted >= max) {
            stream.cancel().await
        } else {
            stream.stats()
        };
        log_summary(kind, &stats, emitted, started);

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Validate the source config
    fn validate<W: Write>(&self, out: &mut W) -> Result<()> {
        let config = self.load_config()?;
        self.output_message(
            out,
            &json!({
                "type": "VALID",
                "name": config.name,
                "kinds": config.resources.kinds().collect::<Vec<_>>(),
            }),
        )
    }

    /// List the kinds of the source config
    fn kinds<W: Write>(&self, out: &mut W) -> Result<()> {
        let config = self.load_config()?;

        let kinds: Vec<Value> = config
            .resources
            .iter()
            .map(|(kind, endpoint)| {
                let (parent, partition) = match &endpoint.partition {
                    Some(PartitionConfig::Parent { kind: parent, .. }) => (Some(parent.as_str()), "parent"),
                    Some(PartitionConfig::List { .. }) => (None, "list"),
                    None => (None, "none"),
                };
                json!({
                    "kind": kind,
                    "method": endpoint.method.to_string(),
                    "path": endpoint.path,
                    "cursor": endpoint.pagination.cursor.name(),
                    "partition": partition,
                    "parent": parent,
                })
            })
            .collect();

        self.output_message(out, &json!({ "type": "KINDS", "kinds": kinds }))
    }

    /// List built-in connectors
    fn list_connectors<W: Write>(&self, out: &mut W) -> Result<()> {
        let connectors: Vec<Value> = BUILTIN_CONNECTORS
            .iter()
            .map(|c| json!({ "name": c.name, "description": c.description }))
            .collect();

        self.output_message(out, &json!({ "type": "CONNECTORS", "connectors": connectors }))
    }

    /// Output a message
    fn output_message<W: Write>(&self, out: &mut W, msg: &Value) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json => serde_json::to_writer(&mut *out, msg)?,
            OutputFormat::Pretty => serde_json::to_writer_pretty(&mut *out, msg)?,
        }
        writeln!(out)?;
        Ok(())
    }
}

/// Write a batch as one `{"job", "kind", "item"}` line per item
fn write_batch<W: Write>(out: &mut W, batch: &Batch, limit: Option<usize>) -> Result<usize> {
    let take = limit.unwrap_or(usize::MAX).min(batch.items.len());
    for item in &batch.items[..take] {
        let line = json!({
            "job": batch.job_id,
            "kind": batch.resource_kind,
            "item": item,
        });
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }
    Ok(take)
}

fn log_summary(kind: &str, stats: &RunStats, emitted: usize, started: Instant) {
    info!(
        kind,
        records = emitted,
        jobs = stats.jobs_total,
        completed = stats.completed,
        failed = stats.failed,
        skipped = stats.skipped,
        cancelled = stats.cancelled,
        pages = stats.pages,
        elapsed = ?started.elapsed(),
        "Run complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn batch(items: Vec<Value>) -> Batch {
        Batch {
            job_id: "repository".to_string(),
            resource_kind: "repository".to_string(),
            parent_id: None,
            page: 1,
            items,
        }
    }

    #[test]
    fn test_write_batch_json_lines() {
        let mut out = Vec::new();
        let written = write_batch(&mut out, &batch(vec![json!({"id": 1}), json!({"id": 2})]), None).unwrap();
        assert_eq!(written, 2);

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(
            lines[1],
            json!({"job": "repository", "kind": "repository", "item": {"id": 2}})
        );
    }

    #[test]
    fn test_write_batch_respects_limit() {
        let mut out = Vec::new();
        let written = write_batch(&mut out, &batch(vec![json!(1), json!(2), json!(3)]), Some(2)).unwrap();
        assert_eq!(written, 2);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn test_list_command() {
        let runner = Runner::new(Cli::try_parse_from(["fetchkit", "list"]).unwrap());
        let mut out = Vec::new();
        runner.run_with(&mut out).await.unwrap();

        let msg: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(msg["type"], "CONNECTORS");
        assert_eq!(msg["connectors"].as_array().unwrap().len(), BUILTIN_CONNECTORS.len());
    }

    #[tokio::test]
    async fn test_kinds_command() {
        let runner = Runner::new(Cli::try_parse_from(["fetchkit", "-c", "azure-devops", "kinds"]).unwrap());
        let mut out = Vec::new();
        runner.run_with(&mut out).await.unwrap();

        let msg: Value = serde_json::from_slice(&out).unwrap();
        let pull_request = msg["kinds"]
            .as_array()
            .unwrap()
            .iter()
            .find(|k| k["kind"] == "pull_request")
            .unwrap();
        assert_eq!(pull_request["parent"], "repository");
        assert_eq!(pull_request["cursor"], "offset");
    }

    #[tokio::test]
    async fn test_missing_config_flag() {
        let runner = Runner::new(Cli::try_parse_from(["fetchkit", "validate"]).unwrap());
        let err = runner.run_with(&mut Vec::new()).await.unwrap_err();
        assert!(err.is_config());
    }
}
