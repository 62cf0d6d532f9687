//! Rate limiting
//!
//! Tracks one or more request-quota windows at once (e.g. per-second and
//! per-hour). A window starts its period on the first hit after being idle
//! or reset, not at construction. The fetch scheduler consults
//! [`RateLimits::threshold`] to cap the size of the next concurrent batch
//! and [`RateLimits::respect_delay`] to wait out exhausted windows before
//! dispatching again.

use crate::config::RateLimitQuota;
use std::time::{Duration, Instant};
use tracing::warn;

/// A single request-quota window.
#[derive(Debug, Clone)]
pub struct RateLimit {
    requests: u32,
    per: Duration,
    hits: u32,
    resets_at: Option<Instant>,
}

impl RateLimit {
    /// Create a window allowing `requests` dispatches per `per`.
    pub fn new(requests: u32, per: Duration) -> Self {
        Self {
            requests: requests.max(1),
            per,
            hits: 0,
            resets_at: None,
        }
    }

    /// Record one dispatched request; the first hit starts the period.
    pub fn hit(&mut self) {
        self.hits += 1;
        if self.resets_at.is_none() {
            self.resets_at = Some(Instant::now() + self.per);
        }
    }

    /// Requests still allowed before this window is exhausted.
    pub fn threshold(&self) -> u32 {
        self.requests.saturating_sub(self.hits)
    }

    /// Whether this window is exhausted.
    pub fn was_reached(&self) -> bool {
        self.hits >= self.requests
    }

    /// The instant this window frees up, if its period has started.
    pub fn resets_at(&self) -> Option<Instant> {
        self.resets_at
    }

    /// Clear the counter and the period.
    pub fn reset(&mut self) {
        self.hits = 0;
        self.resets_at = None;
    }
}

/// The aggregator of request-quota windows.
#[derive(Debug, Clone, Default)]
pub struct RateLimits {
    limits: Vec<RateLimit>,
}

impl RateLimits {
    /// Create an aggregator with no windows (unlimited).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the aggregator from configured quotas.
    pub fn from_quotas(quotas: &[RateLimitQuota]) -> Self {
        let limits = quotas
            .iter()
            .map(|quota| RateLimit::new(quota.requests, quota.per))
            .collect();
        Self { limits }
    }

    /// Add a window allowing `requests` dispatches per `per`.
    pub fn add(&mut self, requests: u32, per: Duration) {
        self.limits.push(RateLimit::new(requests, per));
    }

    /// Whether any window is being tracked.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Record one dispatched request against every window.
    pub fn hit(&mut self) {
        for limit in &mut self.limits {
            limit.hit();
        }
    }

    /// The minimum remaining quota across all windows; `None` when no
    /// window is tracked.
    pub fn threshold(&self) -> Option<u32> {
        self.limits.iter().map(RateLimit::threshold).min()
    }

    /// The latest instant by which every exhausted window frees up, or
    /// `None` when none is exhausted. Exhausted windows are reset.
    pub fn reset_at(&mut self) -> Option<Instant> {
        let mut latest = None;
        for limit in &mut self.limits {
            if limit.was_reached() {
                latest = latest.max(limit.resets_at());
                limit.reset();
            }
        }
        latest
    }

    /// Sleep until new requests may be dispatched.
    pub async fn respect_delay(&mut self) {
        if let Some(at) = self.reset_at() {
            let now = Instant::now();
            if at > now {
                warn!(delay_ms = (at - now).as_millis() as u64, "rate limit reached, waiting");
                tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await;
            }
        }
    }
}
