//! GitHub contribution calendars with a layered fallback chain.
//!
//! Fetchers are tried in order (GraphQL API, then profile scrape); when every
//! network source fails the service synthesizes a deterministic mock calendar
//! so the endpoint never breaks the page that embeds it.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Date, OffsetDateTime, Weekday};
use tracing::{debug, warn};

use crate::infra::error::InfraError;

pub const WEEKS_SHOWN: usize = 53;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContributionDay {
    pub date: Date,
    pub count: u32,
    /// GitHub intensity bucket, 0 through 4.
    pub level: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContributionWeek {
    pub days: Vec<ContributionDay>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContributionSource {
    Api,
    Scrape,
    Mock,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContributionCalendar {
    pub user: String,
    pub total: u64,
    pub weeks: Vec<ContributionWeek>,
    pub source: ContributionSource,
}

#[derive(Debug, Error)]
pub enum ContributionsError {
    #[error("{0}")]
    Validation(String),
}

/// One way of obtaining a calendar. Implementations live in the infra layer.
#[async_trait]
pub trait ContributionFetcher: Send + Sync {
    fn source(&self) -> ContributionSource;
    async fn fetch(&self, user: &str) -> Result<ContributionCalendar, InfraError>;
}

struct CachedCalendar {
    calendar: ContributionCalendar,
    stored_at: Instant,
}

pub struct ContributionService {
    fetchers: Vec<Arc<dyn ContributionFetcher>>,
    cache: Mutex<LruCache<String, CachedCalendar>>,
    ttl: Duration,
}

impl ContributionService {
    pub fn new(
        fetchers: Vec<Arc<dyn ContributionFetcher>>,
        cache_capacity: std::num::NonZeroUsize,
        ttl: Duration,
    ) -> Self {
        Self {
            fetchers,
            cache: Mutex::new(LruCache::new(cache_capacity)),
            ttl,
        }
    }

    /// Resolve a calendar for `user`, consulting the cache first. A mock
    /// result is cached too, so a flapping upstream is not hammered.
    pub async fn calendar(&self, user: &str) -> Result<ContributionCalendar, ContributionsError> {
        let user = validate_username(user)?;
        let key = user.to_ascii_lowercase();

        if let Some(cached) = self.cached(&key) {
            debug!(target = "application::contributions", user = %user, "cache hit");
            return Ok(cached);
        }

        let calendar = self.fetch_uncached(&user).await;

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CachedCalendar {
                    calendar: calendar.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        Ok(calendar)
    }

    fn cached(&self, key: &str) -> Option<ContributionCalendar> {
        let mut cache = self.cache.lock().ok()?;
        match cache.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.calendar.clone()),
            Some(_) => {
                cache.pop(key);
                None
            }
            None => None,
        }
    }

    async fn fetch_uncached(&self, user: &str) -> ContributionCalendar {
        for fetcher in &self.fetchers {
            match fetcher.fetch(user).await {
                Ok(calendar) => return calendar,
                Err(err) => {
                    warn!(
                        target = "application::contributions",
                        user,
                        source = ?fetcher.source(),
                        error = %err,
                        "contribution fetch failed, trying next source"
                    );
                }
            }
        }
        mock_calendar(user, OffsetDateTime::now_utc().date())
    }
}

fn validate_username(user: &str) -> Result<String, ContributionsError> {
    let user = user.trim();
    let valid = !user.is_empty()
        && user.len() <= 39
        && !user.starts_with('-')
        && !user.ends_with('-')
        && user
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
    if valid {
        Ok(user.to_string())
    } else {
        Err(ContributionsError::Validation(
            "username must be 1-39 alphanumeric or hyphen characters".into(),
        ))
    }
}

/// Map a contribution count onto GitHub's five intensity buckets.
pub fn level_for_count(count: u32) -> u8 {
    match count {
        0 => 0,
        1..=3 => 1,
        4..=7 => 2,
        8..=12 => 3,
        _ => 4,
    }
}

/// Deterministic placeholder calendar seeded from the username, so the same
/// user always renders the same plausible-looking graph.
pub fn mock_calendar(user: &str, today: Date) -> ContributionCalendar {
    let digest = Sha256::digest(user.to_ascii_lowercase().as_bytes());

    // Start on the Sunday that begins the window, matching GitHub's grid.
    let total_days = WEEKS_SHOWN * 7;
    let mut cursor = today;
    while cursor.weekday() != Weekday::Saturday {
        cursor = cursor.next_day().unwrap_or(cursor);
    }
    let start = cursor - time::Duration::days(total_days as i64 - 1);

    let mut weeks = Vec::with_capacity(WEEKS_SHOWN);
    let mut total: u64 = 0;
    let mut day = start;
    for week_index in 0..WEEKS_SHOWN {
        let mut days = Vec::with_capacity(7);
        for day_index in 0..7 {
            let byte = digest[(week_index * 7 + day_index) % digest.len()];
            // Future days in the current week stay empty.
            let count = if day > today {
                0
            } else {
                match byte % 10 {
                    0..=4 => 0,
                    5..=6 => u32::from(byte % 4) + 1,
                    7..=8 => u32::from(byte % 6) + 4,
                    _ => u32::from(byte % 8) + 9,
                }
            };
            total += u64::from(count);
            days.push(ContributionDay {
                date: day,
                count,
                level: level_for_count(count),
            });
            day = day.next_day().unwrap_or(day);
        }
        weeks.push(ContributionWeek { days });
    }

    ContributionCalendar {
        user: user.to_string(),
        total,
        weeks,
        source: ContributionSource::Mock,
    }
}
