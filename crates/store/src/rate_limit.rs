//! Fixed-window request rate limiter keyed by client identity.
//!
//! The counter is a fixed window, not a sliding window or token bucket: a
//! client can burst up to 2x the cap across a window boundary. That is an
//! accepted property of the algorithm and part of the externally observed
//! throughput contract — do not tighten it here.
//!
//! # Consistency
//!
//! Over a plain [`KvStore`] the check is a read-modify-write of two store
//! operations and can undercount under concurrent bursts from the same key.
//! When the backend implements [`CounterStore`] (SQLite does) the limiter
//! uses its atomic window increment and cannot undercount.

use animus_core::error::StoreError;
use animus_core::kv::{CounterStore, KvStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Persisted per-client counter state.
///
/// A record whose window has elapsed is treated as absent, never
/// decremented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRecord {
    pub count: u32,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub window_start: DateTime<Utc>,
}

/// The admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    pub allowed: bool,

    /// How long until the current window resets; set on denial.
    pub retry_after: Option<std::time::Duration>,
}

impl Admission {
    fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after: None,
        }
    }

    fn denied(retry_after: std::time::Duration) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
        }
    }
}

enum LimiterStore {
    Kv(Arc<dyn KvStore>),
    Atomic(Arc<dyn CounterStore>),
}

/// Fixed-window counter: N requests per W seconds per client key.
pub struct RateLimiter {
    store: LimiterStore,
    window_secs: u64,
    max_requests: u32,
}

impl RateLimiter {
    /// Limiter over a plain KV store (racy read-modify-write, documented
    /// above).
    pub fn new(store: Arc<dyn KvStore>, window_secs: u64, max_requests: u32) -> Self {
        Self {
            store: LimiterStore::Kv(store),
            window_secs,
            max_requests,
        }
    }

    /// Limiter over a backend with an atomic window increment.
    pub fn with_atomic(store: Arc<dyn CounterStore>, window_secs: u64, max_requests: u32) -> Self {
        Self {
            store: LimiterStore::Atomic(store),
            window_secs,
            max_requests,
        }
    }

    /// Decide admission for one request from `client_key`.
    pub async fn admit(&self, client_key: &str) -> Result<Admission, StoreError> {
        self.admit_at(client_key, Utc::now()).await
    }

    /// Admission at an explicit instant. The atomic path uses the store's
    /// own clock and ignores `now`.
    pub async fn admit_at(
        &self,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        let key = format!("ratelimit:{client_key}");

        match &self.store {
            LimiterStore::Atomic(counters) => {
                let outcome = counters
                    .incr_in_window(&key, self.window_secs, self.max_requests)
                    .await?;
                if outcome.admitted {
                    Ok(Admission::allowed())
                } else {
                    Ok(Admission::denied(self.until_reset(
                        outcome.window_start,
                        Utc::now(),
                    )))
                }
            }
            LimiterStore::Kv(kv) => {
                let record = match kv.get(&key).await? {
                    Some(raw) => match serde_json::from_str::<RateRecord>(&raw) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            // Corrupt counter: reset rather than lock the
                            // client out or wave everyone through untracked
                            warn!(key = %key, error = %e, "Corrupt rate record, resetting window");
                            None
                        }
                    },
                    None => None,
                };

                let window = Duration::seconds(self.window_secs as i64);

                match record {
                    // Absent, or the window has elapsed: fresh window
                    None => {
                        self.write_record(kv, &key, RateRecord { count: 1, window_start: now })
                            .await?;
                        Ok(Admission::allowed())
                    }
                    Some(r) if now - r.window_start >= window => {
                        self.write_record(kv, &key, RateRecord { count: 1, window_start: now })
                            .await?;
                        Ok(Admission::allowed())
                    }
                    // Inside the window, under the cap: count this request
                    Some(r) if r.count < self.max_requests => {
                        self.write_record(
                            kv,
                            &key,
                            RateRecord {
                                count: r.count + 1,
                                window_start: r.window_start,
                            },
                        )
                        .await?;
                        Ok(Admission::allowed())
                    }
                    // At the cap: deny without mutating
                    Some(r) => Ok(Admission::denied(self.until_reset(r.window_start, now))),
                }
            }
        }
    }

    async fn write_record(
        &self,
        kv: &Arc<dyn KvStore>,
        key: &str,
        record: RateRecord,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&record).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        // TTL ~ the window so stale records self-clean
        kv.put(key, &raw, self.window_secs).await
    }

    fn until_reset(&self, window_start: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
        let reset_at = window_start + Duration::seconds(self.window_secs as i64);
        (reset_at - now).to_std().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryKv;

    fn limiter(window_secs: u64, max_requests: u32) -> RateLimiter {
        RateLimiter::new(Arc::new(InMemoryKv::new()), window_secs, max_requests)
    }

    #[tokio::test]
    async fn first_request_is_admitted() {
        let limiter = limiter(60, 20);
        let admission = limiter.admit("1.2.3.4").await.unwrap();
        assert!(admission.allowed);
        assert!(admission.retry_after.is_none());
    }

    #[tokio::test]
    async fn twenty_first_in_window_is_denied() {
        let limiter = limiter(60, 20);
        let start = Utc::now();

        for i in 0..20 {
            let admission = limiter
                .admit_at("1.2.3.4", start + Duration::seconds(i))
                .await
                .unwrap();
            assert!(admission.allowed, "request {i} should be admitted");
        }

        let admission = limiter
            .admit_at("1.2.3.4", start + Duration::seconds(30))
            .await
            .unwrap();
        assert!(!admission.allowed);
        let retry_after = admission.retry_after.unwrap();
        assert!(retry_after <= std::time::Duration::from_secs(30));
        assert!(retry_after > std::time::Duration::from_secs(0));
    }

    #[tokio::test]
    async fn window_resets_after_elapsing() {
        let limiter = limiter(60, 20);
        let start = Utc::now();

        for _ in 0..20 {
            assert!(limiter.admit_at("key", start).await.unwrap().allowed);
        }
        assert!(!limiter.admit_at("key", start).await.unwrap().allowed);

        // W seconds after the first request the window is stale
        let later = start + Duration::seconds(60);
        assert!(limiter.admit_at("key", later).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn denial_does_not_extend_the_window() {
        let limiter = limiter(60, 1);
        let start = Utc::now();

        assert!(limiter.admit_at("key", start).await.unwrap().allowed);

        // Hammering while denied must not push the reset point forward
        for i in 1..10 {
            let admission = limiter
                .admit_at("key", start + Duration::seconds(i))
                .await
                .unwrap();
            assert!(!admission.allowed);
        }

        assert!(
            limiter
                .admit_at("key", start + Duration::seconds(60))
                .await
                .unwrap()
                .allowed
        );
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = limiter(60, 1);
        let now = Utc::now();

        assert!(limiter.admit_at("alice", now).await.unwrap().allowed);
        assert!(!limiter.admit_at("alice", now).await.unwrap().allowed);
        assert!(limiter.admit_at("bob", now).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn corrupt_record_resets_instead_of_failing() {
        let kv = Arc::new(InMemoryKv::new());
        kv.put("ratelimit:key", "not json", 60).await.unwrap();

        let limiter = RateLimiter::new(kv, 60, 20);
        let admission = limiter.admit("key").await.unwrap();
        assert!(admission.allowed);
    }
}
