//! Fetch state machine, cache and retry backoff, keyed by location and method.
//!
//! Each `(lat, lng, method)` key moves through
//! `Idle → InFlight → Success | Failed(retry_at)`. Only the current key may
//! accept completions, and only for the generation it is waiting on. A response
//! for a superseded key, or from an attempt that was replaced, is dropped
//! whatever order the responses arrive in.

use chrono::{DateTime, Duration as ChronoDuration, Local};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::time::Duration;

use crate::constants::{
    CACHE_EVICT_AFTER, CACHE_FRESH_FOR, MAX_FETCH_RETRIES, RETRY_BASE_DELAY, RETRY_MAX_DELAY,
};
use crate::error::QiyamError;
use crate::night::{DayAnchoringResolver, ResolvedNight};
use crate::provider::TimingsProvider;

/// Cache key. Coordinates are compared at micro-degree resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchKey {
    lat_micro: i64,
    lng_micro: i64,
    pub method_id: u32,
}

impl FetchKey {
    pub fn new(latitude: f64, longitude: f64, method_id: u32) -> Self {
        Self {
            lat_micro: (latitude * 1e6).round() as i64,
            lng_micro: (longitude * 1e6).round() as i64,
            method_id,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.lat_micro as f64 / 1e6
    }

    pub fn longitude(&self) -> f64 {
        self.lng_micro as f64 / 1e6
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    InFlight {
        generation: u64,
        attempt: u32,
    },
    Success {
        fetched_at: DateTime<Local>,
    },
    Failed {
        attempts: u32,
        error: QiyamError,
        retry_at: Option<DateTime<Local>>,
    },
}

/// Last good data for a key, kept while a refresh is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedNight {
    pub night: ResolvedNight,
    pub fetched_at: DateTime<Local>,
}

#[derive(Debug)]
struct CacheEntry {
    state: FetchState,
    data: Option<CachedNight>,
    last_used: DateTime<Local>,
}

/// What the caller should do for the current key.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchAction {
    /// Start a fetch; report back with this generation.
    Start { generation: u64, attempt: u32 },
    /// Nothing to do before this instant.
    WaitUntil(DateTime<Local>),
    /// Nothing to do.
    None,
}

/// How a completion was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Stored,
    RetryAt(DateTime<Local>),
    GaveUp(QiyamError),
    Discarded,
}

/// A finished fetch as reported by a worker.
#[derive(Debug)]
pub struct FetchCompletion {
    pub key: FetchKey,
    pub generation: u64,
    pub result: Result<ResolvedNight, QiyamError>,
}

/// Delay before retrying after the failed attempt with 0-based `attempt` index:
/// 1 s, 2 s, 4 s, ... capped at 10 s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    RETRY_BASE_DELAY
        .checked_mul(factor)
        .unwrap_or(RETRY_MAX_DELAY)
        .min(RETRY_MAX_DELAY)
}

fn chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX)
}

#[derive(Debug, Default)]
pub struct FetchCache {
    entries: HashMap<FetchKey, CacheEntry>,
    current: Option<FetchKey>,
    next_generation: u64,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `key` the current key, creating its entry on first use.
    pub fn select(&mut self, key: FetchKey, now: DateTime<Local>) {
        self.current = Some(key);
        self.entries
            .entry(key)
            .or_insert_with(|| CacheEntry {
                state: FetchState::Idle,
                data: None,
                last_used: now,
            })
            .last_used = now;
    }

    pub fn current(&self) -> Option<FetchKey> {
        self.current
    }

    fn current_entry(&self) -> Option<&CacheEntry> {
        self.current.and_then(|key| self.entries.get(&key))
    }

    fn current_entry_mut(&mut self) -> Option<&mut CacheEntry> {
        let key = self.current?;
        self.entries.get_mut(&key)
    }

    pub fn state(&self) -> Option<&FetchState> {
        self.current_entry().map(|entry| &entry.state)
    }

    /// Last good data for the current key, fresh or stale.
    pub fn cached(&self) -> Option<&CachedNight> {
        self.current_entry().and_then(|entry| entry.data.as_ref())
    }

    pub fn is_fresh(&self, now: DateTime<Local>) -> bool {
        self.cached()
            .is_some_and(|cached| now - cached.fetched_at < chrono(CACHE_FRESH_FOR))
    }

    /// Force the next [`FetchCache::next_action`] to refetch, keeping the cached data.
    pub fn invalidate(&mut self) {
        if let Some(entry) = self.current_entry_mut()
            && matches!(entry.state, FetchState::Success { .. })
        {
            entry.state = FetchState::Idle;
        }
    }

    /// Decide the next step for the current key and mark it in flight if a fetch should start.
    pub fn next_action(&mut self, now: DateTime<Local>) -> FetchAction {
        let fresh = self.is_fresh(now);
        let generation = self.next_generation + 1;

        let Some(entry) = self.current_entry_mut() else {
            return FetchAction::None;
        };
        entry.last_used = now;

        let attempt = match &entry.state {
            FetchState::InFlight { .. } => return FetchAction::None,
            FetchState::Success { .. } if fresh => return FetchAction::None,
            FetchState::Failed {
                retry_at: Some(at), ..
            } if now < *at => return FetchAction::WaitUntil(*at),
            FetchState::Failed { retry_at: None, .. } => return FetchAction::None,
            FetchState::Failed { attempts, .. } => *attempts,
            FetchState::Idle | FetchState::Success { .. } => 0,
        };

        entry.state = FetchState::InFlight {
            generation,
            attempt,
        };
        self.next_generation = generation;
        FetchAction::Start {
            generation,
            attempt,
        }
    }

    /// Apply a worker's result. Completions for other keys or older generations are dropped.
    pub fn complete(&mut self, completion: FetchCompletion, now: DateTime<Local>) -> CompletionOutcome {
        let FetchCompletion {
            key,
            generation,
            result,
        } = completion;

        let Some(entry) = self.entries.get_mut(&key) else {
            return CompletionOutcome::Discarded;
        };

        let attempt = match entry.state {
            FetchState::InFlight {
                generation: expected,
                attempt,
            } if expected == generation => attempt,
            _ => return CompletionOutcome::Discarded,
        };

        if self.current != Some(key) {
            // Superseded by a settings change: forget the attempt so a return to this key refetches
            entry.state = FetchState::Idle;
            return CompletionOutcome::Discarded;
        }

        match result {
            Ok(night) => {
                entry.data = Some(CachedNight {
                    night,
                    fetched_at: now,
                });
                entry.state = FetchState::Success { fetched_at: now };
                CompletionOutcome::Stored
            }
            Err(error) if error.is_retryable() && attempt < MAX_FETCH_RETRIES => {
                let retry_at = now + chrono(backoff_delay(attempt));
                entry.state = FetchState::Failed {
                    attempts: attempt + 1,
                    error,
                    retry_at: Some(retry_at),
                };
                CompletionOutcome::RetryAt(retry_at)
            }
            Err(error) => {
                entry.state = FetchState::Failed {
                    attempts: attempt + 1,
                    error: error.clone(),
                    retry_at: None,
                };
                CompletionOutcome::GaveUp(error)
            }
        }
    }

    /// Drop entries other than the current one that have not been used for an hour.
    pub fn evict(&mut self, now: DateTime<Local>) -> usize {
        let current = self.current;
        let limit = chrono(CACHE_EVICT_AFTER);
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| Some(*key) == current || now - entry.last_used <= limit);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve tonight's timings for `key` at wall-clock `now` in timezone `tz`.
pub fn run_fetch(
    provider: &dyn TimingsProvider,
    key: FetchKey,
    tz: Tz,
    now: DateTime<Local>,
) -> Result<ResolvedNight, QiyamError> {
    DayAnchoringResolver::new(provider, key.latitude(), key.longitude(), key.method_id, tz)
        .resolve(now.with_timezone(&tz))
}
