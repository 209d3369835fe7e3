//! Paginator state machine
//!
//! Drives one fetch job: `Idle -> Fetching -> Yielding -> ... -> Done`, or
//! `Failed` on the first unrecoverable error. Pages are only requested when
//! the consumer asks for the next batch.

use super::types::{PaginationConfig, PaginationState};
use crate::error::Result;
use crate::http::PageFetcher;
use crate::request::RequestBuilder;
use futures::stream::{self, Stream};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle phase of a [`Paginator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorPhase {
    /// Nothing requested yet
    Idle,
    /// A page request is in flight
    Fetching,
    /// The last page produced a batch; more may follow
    Yielding,
    /// No more pages
    Done,
    /// Stopped on an error; nothing more will be yielded
    Failed,
}

impl PaginatorPhase {
    /// Check if the phase is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Lazily walks the pages of one endpoint for one job
pub struct Paginator {
    fetcher: Arc<PageFetcher>,
    builder: RequestBuilder,
    pagination: PaginationConfig,
    state: PaginationState,
    phase: PaginatorPhase,
    label: String,
}

impl Paginator {
    /// Create a paginator, validating the pagination config against the
    /// job's base query before any request is made
    pub fn new(
        fetcher: Arc<PageFetcher>,
        builder: RequestBuilder,
        pagination: PaginationConfig,
    ) -> Result<Self> {
        pagination.validate(builder.base_query())?;
        let state = PaginationState::for_style(&pagination.cursor);
        let label = builder.url().to_string();

        Ok(Self {
            fetcher,
            builder,
            pagination,
            state,
            phase: PaginatorPhase::Idle,
            label,
        })
    }

    /// Set the label used in log messages
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Current phase
    pub fn phase(&self) -> PaginatorPhase {
        self.phase
    }

    /// Current pagination state
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Fetch pages until one yields items.
    ///
    /// Returns `None` once pagination is complete or after an error has been
    /// returned. Empty intermediate pages are followed without being yielded.
    pub async fn next_batch(&mut self) -> Option<Result<Vec<Value>>> {
        loop {
            if self.phase.is_terminal() {
                return None;
            }
            if self.state.done {
                self.phase = PaginatorPhase::Done;
                debug!(
                    job = %self.label,
                    pages = self.state.pages_fetched,
                    records = self.state.total_fetched,
                    "Pagination complete"
                );
                return None;
            }

            self.phase = PaginatorPhase::Fetching;
            let page = match self.fetch_page().await {
                Ok(page) => page,
                Err(e) => {
                    self.phase = PaginatorPhase::Failed;
                    return Some(Err(e));
                }
            };

            self.state.advance(page.items.len(), page.next_cursor);
            if let Some(max_pages) = self.pagination.max_pages {
                if self.state.pages_fetched >= max_pages {
                    self.state.mark_done();
                }
            }

            if page.items.is_empty() {
                debug!(job = %self.label, page = self.state.pages_fetched, "Empty page");
                continue;
            }

            self.phase = PaginatorPhase::Yielding;
            return Some(Ok(page.items));
        }
    }

    async fn fetch_page(&self) -> Result<super::PageResult> {
        let request = self.builder.build(&self.pagination.cursor, &self.state)?;
        self.fetcher.fetch(&request, &self.pagination).await
    }

    /// Turn the paginator into a stream of batches
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Value>>> + Send {
        stream::unfold(self, |mut paginator| async move {
            let batch = paginator.next_batch().await?;
            Some((batch, paginator))
        })
    }
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("label", &self.label)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
