//! Durable key-value store traits.
//!
//! The rate limiter and the session store both persist their state through
//! this narrow interface: string values, per-key TTL, no transactions.
//!
//! # Consistency
//!
//! `get` followed by `put` is not atomic. Concurrent requests for the same
//! key can race on read-modify-write; callers that care (the rate limiter)
//! should prefer a backend that also implements [`CounterStore`], which
//! performs the whole fixed-window increment in one atomic operation.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A durable key-value store with per-key expiry.
///
/// Implementations: in-memory timestamped map, SQLite.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "sqlite").
    fn name(&self) -> &str;

    /// Read a value. Expired keys are treated as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value with a TTL in seconds. Overwrites and refreshes expiry.
    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;
}

/// Outcome of an atomic fixed-window counter increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowCount {
    /// Whether the increment was admitted (count stayed within the cap).
    pub admitted: bool,

    /// The counter value after this call.
    pub count: u32,

    /// When the current window opened.
    pub window_start: DateTime<Utc>,
}

/// Optional atomic fixed-window counter, for backends that can do the
/// read-modify-write in a single operation.
///
/// Semantics per call:
/// - no counter, or window older than `window_secs` → reset to 1, admitted
/// - counter below `cap` → increment, admitted
/// - counter at `cap` → unchanged, denied
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr_in_window(
        &self,
        key: &str,
        window_secs: u64,
        cap: u32,
    ) -> Result<WindowCount, StoreError>;
}
