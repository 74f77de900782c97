//! In-memory key-value backend — a timestamped map with lazy expiry.
//!
//! Useful for tests and single-node deployments where cross-process
//! durability isn't needed. Expired entries are treated as absent on read
//! and evicted opportunistically once the map grows.

use animus_core::error::StoreError;
use animus_core::kv::KvStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// An in-memory KV store with per-key TTL.
pub struct InMemoryKv {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Utc::now())
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        // Opportunistic eviction keeps the map from accumulating dead keys
        if entries.len() > 10_000 {
            entries.retain(|_, e| e.expires_at > now);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + Duration::seconds(ttl_secs as i64),
            },
        );
        Ok(())
    }
}
