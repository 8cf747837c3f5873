//! Fixed-window rate limiting keyed by client identifier.
//!
//! Each identifier owns a counter and a window expiry. The first request in
//! a window sets the expiry; requests past the cap are refused until the
//! window rolls over. Expired entries are swept lazily on the request path,
//! no background task required.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::counter;

/// Sweep the whole map once per this many checks.
const SWEEP_EVERY: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

struct WindowEntry {
    count: u32,
    resets_at: Instant,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    entries: DashMap<String, WindowEntry>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn check(&self, identifier: &str) -> RateDecision {
        self.check_at(identifier, Instant::now())
    }

    /// Clock-injected variant of [`check`](Self::check), used by tests.
    pub fn check_at(&self, identifier: &str, now: Instant) -> RateDecision {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }

        let mut entry = self
            .entries
            .entry(identifier.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                resets_at: now + self.window,
            });

        if now >= entry.resets_at {
            entry.count = 0;
            entry.resets_at = now + self.window;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            RateDecision::Allowed
        } else {
            counter!("vetrina_rate_limited_total").increment(1);
            RateDecision::Limited {
                retry_after: entry.resets_at.saturating_duration_since(now),
            }
        }
    }

    fn sweep(&self, now: Instant) {
        self.entries.retain(|_, entry| now < entry.resets_at);
    }

    #[cfg(test)]
    fn tracked_identifiers(&self) -> usize {
        self.entries.len()
    }
}
