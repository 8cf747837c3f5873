//! Per-post view counters.
//!
//! Counts are best effort by contract: when the store fails the caller gets
//! `None` and renders nothing, never an error page.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use crate::infra::error::InfraError;

/// Counter storage seam. The in-memory store is the default; a persistent
/// implementation can replace it without touching the handlers.
#[async_trait]
pub trait ViewCountStore: Send + Sync {
    async fn record_view(&self, slug: &str) -> Result<u64, InfraError>;
    async fn current(&self, slug: &str) -> Result<u64, InfraError>;
}

pub struct ViewCounts {
    store: Box<dyn ViewCountStore>,
}

impl ViewCounts {
    pub fn new(store: Box<dyn ViewCountStore>) -> Self {
        Self { store }
    }

    /// Record a view and return the new total, or `None` on store failure.
    pub async fn record(&self, slug: &str) -> Option<u64> {
        match self.store.record_view(slug).await {
            Ok(count) => Some(count),
            Err(err) => {
                warn!(
                    target = "application::view_counts",
                    slug,
                    error = %err,
                    "view counter unavailable"
                );
                None
            }
        }
    }

    pub async fn current(&self, slug: &str) -> Option<u64> {
        match self.store.current(slug).await {
            Ok(count) => Some(count),
            Err(err) => {
                warn!(
                    target = "application::view_counts",
                    slug,
                    error = %err,
                    "view counter unavailable"
                );
                None
            }
        }
    }
}

/// Process-local counters. Reset on restart, which is acceptable for a
/// personal site and keeps the default deploy dependency free.
#[derive(Default)]
pub struct InMemoryViewCounts {
    counts: DashMap<String, u64>,
}

#[async_trait]
impl ViewCountStore for InMemoryViewCounts {
    async fn record_view(&self, slug: &str) -> Result<u64, InfraError> {
        let mut entry = self.counts.entry(slug.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn current(&self, slug: &str) -> Result<u64, InfraError> {
        Ok(self.counts.get(slug).map(|count| *count).unwrap_or(0))
    }
}
