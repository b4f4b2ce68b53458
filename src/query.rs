//! Keyed query cache with freshness window, bounded retry and supersession
//!
//! Shared by the lead page cache (keyed by page number) and the campaign
//! list (single key). Each key keeps its last successful value plus the
//! ticket of the newest request issued for it.
//!
//! # Fetch flow
//!
//! ```text
//! fetch(key)
//!     ↓
//! fresh entry? → return it, no network
//!     ↓
//! issue ticket (newest for key)
//!     ↓
//! attempt ──Err(retryable)──→ backoff, retry (up to policy.retries)
//!     ↓ Ok
//! ticket still newest? → store; otherwise drop the result
//! ```
//!
//! A slow request that was overtaken by a newer one for the same key never
//! overwrites the newer result.

use crate::clock::SharedClock;
use crate::error::ApiError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Upper bound on the delay between retry attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Freshness and retry settings for one query family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    /// How long a fetched value is served without refetching
    pub stale_time: Duration,
    /// Extra attempts after the first failure (network errors only)
    pub retries: u32,
    /// Base delay before the first retry; doubles per attempt
    pub retry_delay: Duration,
}

impl QueryPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}

/// Identifies one issued request for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Result of a [`QueryCache::fetch`]
#[derive(Debug, Clone)]
pub struct QueryOutcome<V> {
    /// Fresh value, or the last known value for the key when the fetch failed
    pub value: Option<V>,
    /// Served from cache without a network call
    pub from_cache: bool,
    /// A newer request for the same key was issued while this one ran
    pub superseded: bool,
    /// Final error, after retries were exhausted
    pub error: Option<ApiError>,
    /// Network attempts made (0 when served from cache)
    pub attempts: u32,
}

struct Entry<V> {
    value: V,
    fetched_at: Instant,
    invalidated: bool,
}

struct Slots<K, V> {
    entries: HashMap<K, Entry<V>>,
    issued: HashMap<K, Ticket>,
    next_ticket: u64,
}

/// Cache of query results keyed by `K`
pub struct QueryCache<K, V> {
    policy: QueryPolicy,
    clock: SharedClock,
    slots: Mutex<Slots<K, V>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(policy: QueryPolicy, clock: SharedClock) -> Self {
        Self {
            policy,
            clock,
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                issued: HashMap::new(),
                next_ticket: 0,
            }),
        }
    }

    pub fn policy(&self) -> QueryPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Slots<K, V>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Value for `key` if it is inside the freshness window and not invalidated
    pub fn fresh(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let slots = self.lock();
        slots.entries.get(key).and_then(|entry| {
            let age = now.saturating_duration_since(entry.fetched_at);
            (!entry.invalidated && age < self.policy.stale_time).then(|| entry.value.clone())
        })
    }

    /// Last successful value for `key`, regardless of age
    pub fn latest(&self, key: &K) -> Option<V> {
        self.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    /// Mark every entry stale; values remain available through [`latest`](Self::latest)
    pub fn invalidate_all(&self) {
        let mut slots = self.lock();
        for entry in slots.entries.values_mut() {
            entry.invalidated = true;
        }
        tracing::debug!(entries = slots.entries.len(), "query cache invalidated");
    }

    /// Issue a new ticket for `key`, superseding any request still in flight
    pub fn issue(&self, key: K) -> Ticket {
        let mut slots = self.lock();
        slots.next_ticket += 1;
        let ticket = Ticket(slots.next_ticket);
        slots.issued.insert(key, ticket);
        ticket
    }

    /// Whether `ticket` is still the newest request issued for `key`
    pub fn is_current(&self, key: &K, ticket: Ticket) -> bool {
        self.lock().issued.get(key) == Some(&ticket)
    }

    /// Store `value` if `ticket` is still current. Returns whether it was stored.
    pub fn settle(&self, key: K, ticket: Ticket, value: V) -> bool {
        let fetched_at = self.clock.now();
        let mut slots = self.lock();
        if slots.issued.get(&key) != Some(&ticket) {
            return false;
        }
        slots.entries.insert(
            key,
            Entry {
                value,
                fetched_at,
                invalidated: false,
            },
        );
        true
    }

    /// Fetch `key`, serving a fresh cached value without calling `fetch_fn`
    pub async fn fetch<F, Fut>(&self, key: K, mut fetch_fn: F) -> QueryOutcome<V>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        if let Some(value) = self.fresh(&key) {
            return QueryOutcome {
                value: Some(value),
                from_cache: true,
                superseded: false,
                error: None,
                attempts: 0,
            };
        }

        let ticket = self.issue(key.clone());
        let mut attempt = 0u32;

        loop {
            let result = fetch_fn().await;
            attempt += 1;

            match result {
                Ok(value) => {
                    let stored = self.settle(key.clone(), ticket, value.clone());
                    if !stored {
                        tracing::debug!(?key, "dropping superseded result");
                    }
                    return QueryOutcome {
                        value: if stored { Some(value) } else { self.latest(&key) },
                        from_cache: false,
                        superseded: !stored,
                        error: None,
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_retryable() && attempt <= self.policy.retries => {
                    let delay = self.policy.backoff(attempt - 1);
                    tracing::debug!(?key, attempt, error = %e, "query failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(?key, attempts = attempt, error = %e, "query failed");
                    return QueryOutcome {
                        value: self.latest(&key),
                        from_cache: false,
                        superseded: !self.is_current(&key, ticket),
                        error: Some(e),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ValidationError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(retries: u32) -> QueryPolicy {
        QueryPolicy {
            stale_time: Duration::from_secs(120),
            retries,
            retry_delay: Duration::ZERO,
        }
    }

    fn cache(retries: u32) -> (QueryCache<u32, String>, ManualClock) {
        let clock = ManualClock::new();
        (QueryCache::new(policy(retries), Arc::new(clock.clone())), clock)
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = QueryPolicy {
            stale_time: Duration::ZERO,
            retries: 2,
            retry_delay: Duration::from_secs(1),
        };
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
        assert_eq!(p.backoff(10), MAX_RETRY_DELAY);
        assert_eq!(p.backoff(40), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn fresh_value_skips_network() {
        let (cache, clock) = cache(2);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let first = cache
            .fetch(1, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("a".to_string())
            })
            .await;
        assert_eq!(first.value.as_deref(), Some("a"));
        assert!(!first.from_cache);

        clock.advance(Duration::from_secs(119));
        let second = cache
            .fetch(1, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("b".to_string())
            })
            .await;
        assert_eq!(second.value.as_deref(), Some("a"));
        assert!(second.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(2));
        let third = cache
            .fetch(1, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("b".to_string())
            })
            .await;
        assert_eq!(third.value.as_deref(), Some("b"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn network_errors_retry_up_to_budget() {
        let (cache, _clock) = cache(2);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let outcome = cache
            .fetch(1, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(ApiError::Network("down".into()))
            })
            .await;

        // first attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.error.is_some());
        assert!(outcome.value.is_none());
    }

    #[tokio::test]
    async fn recovers_within_retry_budget() {
        let (cache, _clock) = cache(2);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let outcome = cache
            .fetch(1, || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ApiError::Timeout)
                } else {
                    Ok("ok".to_string())
                }
            })
            .await;

        assert_eq!(outcome.value.as_deref(), Some("ok"));
        assert!(outcome.error.is_none());
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let (cache, _clock) = cache(2);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let outcome = cache
            .fetch(1, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(ValidationError::Malformed("bad".into()).into())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn failure_falls_back_to_last_known_value() {
        let (cache, _clock) = cache(0);
        cache.fetch(1, || async move { Ok("old".to_string()) }).await;
        cache.invalidate_all();

        let outcome = cache
            .fetch(1, || async move { Err(ApiError::Network("down".into())) })
            .await;
        assert_eq!(outcome.value.as_deref(), Some("old"));
        assert!(outcome.error.is_some());
    }

    #[test]
    fn stale_ticket_cannot_overwrite_newer_result() {
        let (cache, _clock) = cache(0);
        let slow = cache.issue(2);
        let fast = cache.issue(2);

        assert!(cache.settle(2, fast, "new".to_string()));
        assert!(!cache.settle(2, slow, "old".to_string()));
        assert_eq!(cache.latest(&2).as_deref(), Some("new"));
    }

    #[test]
    fn tickets_are_per_key() {
        let (cache, _clock) = cache(0);
        let page_one = cache.issue(1);
        let _page_two = cache.issue(2);

        assert!(cache.is_current(&1, page_one));
        assert!(cache.settle(1, page_one, "one".to_string()));
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (cache, _clock) = cache(0);
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let fetch = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("v".to_string())
        };

        cache.fetch(7, fetch).await;
        cache.fetch(7, fetch).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate_all();
        assert!(cache.fresh(&7).is_none());
        assert_eq!(cache.latest(&7).as_deref(), Some("v"));

        cache.fetch(7, fetch).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
