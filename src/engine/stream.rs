//! Merged batch stream
//!
//! The consumer side of a coordinator run. The driver is spawned on the first
//! poll; dropping the stream cancels the run.

use super::types::{Batch, RunOutput, RunStats};
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

enum Driver {
    Pending(BoxFuture<'static, ()>),
    Running(JoinHandle<()>),
    Finished,
}

/// Lazy, merged stream of batches from every job of a run.
///
/// Yields `Ok(batch)` as jobs produce pages and, if any job failed, one final
/// `Err(Error::JobsFailed { .. })` after every job has reached a terminal
/// state.
pub struct BatchStream {
    rx: mpsc::Receiver<Result<Batch>>,
    driver: Driver,
    cancel: CancellationToken,
    stats: watch::Receiver<RunStats>,
}

impl BatchStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<Result<Batch>>,
        driver: BoxFuture<'static, ()>,
        cancel: CancellationToken,
        stats: watch::Receiver<RunStats>,
    ) -> Self {
        Self {
            rx,
            driver: Driver::Pending(driver),
            cancel,
            stats,
        }
    }

    /// Statistics so far
    pub fn stats(&self) -> RunStats {
        self.stats.borrow().clone()
    }

    /// Token that cancels this run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop scheduling, cancel running jobs and wait until every job task has
    /// exited and released its leases
    pub async fn cancel(mut self) -> RunStats {
        self.cancel.cancel();
        self.rx.close();

        if let Driver::Running(handle) = std::mem::replace(&mut self.driver, Driver::Finished) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Coordinator driver did not shut down cleanly");
            }
        }
        self.stats()
    }

    /// Consume the whole stream
    pub async fn drain(mut self) -> RunOutput {
        let mut batches = Vec::new();
        let mut error = None;

        while let Some(next) = self.next().await {
            match next {
                Ok(batch) => batches.push(batch),
                Err(e) => error = Some(e),
            }
        }

        if let Driver::Running(handle) = std::mem::replace(&mut self.driver, Driver::Finished) {
            if let Err(e) = handle.await {
                error.get_or_insert(Error::Other(format!("coordinator driver failed: {e}")));
            }
        }

        RunOutput {
            batches,
            error,
            stats: self.stats(),
        }
    }
}

impl Stream for BatchStream {
    type Item = Result<Batch>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if matches!(this.driver, Driver::Pending(_)) {
            if let Driver::Pending(driver) = std::mem::replace(&mut this.driver, Driver::Finished) {
                this.driver = Driver::Running(tokio::spawn(driver));
            }
        }

        this.rx.poll_recv(cx)
    }
}

impl Drop for BatchStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for BatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let driver = match self.driver {
            Driver::Pending(_) => "pending",
            Driver::Running(_) => "running",
            Driver::Finished => "finished",
        };
        f.debug_struct("BatchStream")
            .field("driver", &driver)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
