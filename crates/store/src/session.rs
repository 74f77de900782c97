//! Bounded, TTL-expiring conversation history keyed by session id.
//!
//! `load` never errors on a missing key — a session exists the moment it is
//! first referenced. Sessions are destroyed only by KV expiry; there is no
//! delete path. Each append refreshes the TTL, so active conversations stay
//! alive while idle ones age out.

use animus_core::error::StoreError;
use animus_core::kv::KvStore;
use animus_core::message::{ChatMessage, SessionHistory, SessionId};
use std::sync::Arc;
use tracing::warn;

/// Rolling per-session message history over the durable KV store.
pub struct SessionStore {
    store: Arc<dyn KvStore>,
    ttl_secs: u64,
    max_history: usize,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KvStore>, ttl_secs: u64, max_history: usize) -> Self {
        Self {
            store,
            ttl_secs,
            max_history,
        }
    }

    fn key(session_id: &SessionId) -> String {
        format!("session:{session_id}")
    }

    /// Load the history for a session. Missing or expired sessions yield a
    /// fresh empty history; a corrupt record is discarded with a warning
    /// rather than poisoning the session id until its TTL runs out.
    pub async fn load(&self, session_id: &SessionId) -> Result<SessionHistory, StoreError> {
        let key = Self::key(session_id);

        match self.store.get(&key).await? {
            None => Ok(SessionHistory::new()),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(history) => Ok(history),
                Err(e) => {
                    warn!(key = %key, error = %e, "Corrupt session record, starting fresh");
                    Ok(SessionHistory::new())
                }
            },
        }
    }

    /// Append the new turn(s), trim to the most recent `max_history`
    /// messages, and persist with a refreshed TTL.
    pub async fn append(
        &self,
        session_id: &SessionId,
        mut history: SessionHistory,
        new_messages: Vec<ChatMessage>,
    ) -> Result<(), StoreError> {
        history.append_trimmed(new_messages, self.max_history);

        let key = Self::key(session_id);
        let raw = serde_json::to_string(&history).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;

        self.store.put(&key, &raw, self.ttl_secs).await
    }
}
