//! Rate limiting implementation
//!
//! Each upstream host gets its own gate: a semaphore bounding in-flight
//! requests, plus an optional governor token bucket bounding throughput.
//! Callers hold a [`Lease`] for the duration of one request attempt.

use crate::error::{Error, Result};
use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error};

type Throttle = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Maximum in-flight requests per host
    #[serde(rename = "max_concurrent_per_host")]
    pub max_concurrent: usize,
    /// Optional requests per second per host
    pub requests_per_second: Option<u32>,
    /// Burst size for the throughput quota
    pub burst_size: u32,
    /// How long `acquire` waits before failing
    #[serde(rename = "acquire_timeout_ms", with = "millis")]
    pub acquire_timeout: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            requests_per_second: None,
            burst_size: 10,
            acquire_timeout: Duration::from_secs(60),
        }
    }
}

impl RateLimiterConfig {
    /// Create a config with the given per-host concurrency
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            ..Default::default()
        }
    }

    /// Add a per-host throughput quota
    #[must_use]
    pub fn with_throughput(mut self, requests_per_second: u32, burst_size: u32) -> Self {
        self.requests_per_second = Some(requests_per_second);
        self.burst_size = burst_size;
        self
    }

    /// Set the acquire timeout
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Check the config is usable
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::invalid_value(
                "max_concurrent_per_host",
                "must be at least 1",
            ));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value("requests_per_second", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Clone)]
struct HostGate {
    slots: Arc<Semaphore>,
    throttle: Option<Arc<Throttle>>,
}

impl HostGate {
    fn new(config: &RateLimiterConfig) -> Self {
        let throttle = config.requests_per_second.map(|rps| {
            let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN))
                .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));
            Arc::new(Governor::direct(quota))
        });

        Self {
            slots: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            throttle,
        }
    }
}

/// Per-host lease-based rate limiter, shared by every job of a run
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimiterConfig>,
    hosts: Arc<DashMap<String, HostGate>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config: Arc::new(config),
            hosts: Arc::new(DashMap::new()),
        }
    }

    /// Limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Per-host in-flight capacity
    pub fn capacity(&self) -> usize {
        self.config.max_concurrent.max(1)
    }

    fn gate(&self, host: &str) -> HostGate {
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| HostGate::new(&self.config))
            .value()
            .clone()
    }

    /// Wait for a slot on `host`, failing after the configured acquire timeout
    pub async fn acquire(&self, host: &str) -> Result<Lease> {
        self.acquire_with_timeout(host, self.config.acquire_timeout)
            .await
    }

    /// Wait for a slot on `host`, failing after `timeout`
    pub async fn acquire_with_timeout(&self, host: &str, timeout: Duration) -> Result<Lease> {
        let gate = self.gate(host);
        // Quota first, so a caller waiting on throughput never holds a slot
        let wait = async {
            if let Some(throttle) = &gate.throttle {
                throttle.until_ready().await;
            }
            gate.slots
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Other(format!("rate limiter for '{host}' is closed")))
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(permit) => Ok(Lease {
                host: host.to_string(),
                permit: Some(permit?),
            }),
            #[allow(clippy::cast_possible_truncation)]
            Err(_) => Err(Error::RateLimitTimeout {
                host: host.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Free slots on `host`
    pub fn available(&self, host: &str) -> usize {
        self.hosts
            .get(host)
            .map_or(self.capacity(), |gate| gate.slots.available_permits())
    }

    /// Leases currently held on `host`
    pub fn in_flight(&self, host: &str) -> usize {
        self.capacity() - self.available(host)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("hosts", &self.hosts.len())
            .finish()
    }
}

/// A held rate-limit slot.
///
/// Released explicitly with [`Lease::release`]; a lease dropped while still
/// held (early return, cancelled task) gives its slot back on drop.
#[derive(Debug)]
pub struct Lease {
    host: String,
    permit: Option<OwnedSemaphorePermit>,
}

impl Lease {
    /// Host this lease was acquired for
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if the slot is still held
    pub fn is_held(&self) -> bool {
        self.permit.is_some()
    }

    /// Give the slot back. Releasing twice is an error.
    pub fn release(&mut self) -> Result<()> {
        match self.permit.take() {
            Some(permit) => {
                drop(permit);
                Ok(())
            }
            None => {
                error!(host = %self.host, "Rate limit lease released twice");
                Err(Error::LeaseAlreadyReleased {
                    host: self.host.clone(),
                })
            }
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.permit.take().is_some() {
            debug!(host = %self.host, "Lease dropped while held, slot returned");
        }
    }
}

/// Serde helper for `Duration` fields written as integer milliseconds
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
