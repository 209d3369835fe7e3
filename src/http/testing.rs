//! Scripted transport for unit tests
//!
//! Answers requests from a closure after an optional delay and records how
//! many calls were in flight at once.

use super::transport::{RawResponse, Transport};
use crate::error::Result;
use crate::request::PageRequest;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = dyn Fn(&PageRequest) -> Result<RawResponse> + Send + Sync;

pub(crate) struct CountingTransport {
    handler: Box<Handler>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<PageRequest>>,
}

impl CountingTransport {
    pub(crate) fn new(
        delay: Duration,
        handler: impl Fn(&PageRequest) -> Result<RawResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request answers with the same JSON body
    pub(crate) fn always(delay: Duration, body: Value) -> Self {
        Self::new(delay, move |_| Ok(json_response(200, &body)))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn send(&self, request: &PageRequest) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(Arc::clone(&self.in_flight));
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(request)
    }
}

pub(crate) fn json_response(status: u16, body: &Value) -> RawResponse {
    RawResponse {
        status,
        headers: HeaderMap::new(),
        body: body.to_string(),
    }
}
