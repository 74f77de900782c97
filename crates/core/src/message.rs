//! Conversation message and session history domain types.
//!
//! A session is a caller-scoped rolling window of chat turns, persisted to
//! the durable key-value store between requests and destroyed only by TTL
//! expiry — there is no explicit delete path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation session.
///
/// Supplied by the caller to continue a conversation, or freshly generated
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The persona's reply
    Assistant,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The rolling message history for one session.
///
/// Invariant: after any write through [`SessionHistory::append_trimmed`],
/// `messages.len() <= max_history`. Trimming always drops from the oldest
/// end, preserving recency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    pub messages: Vec<ChatMessage>,

    /// When this session was first referenced (unix millis on the wire, to
    /// stay readable next to the rate-limit records in the same store).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
}

impl SessionHistory {
    /// A fresh empty history, created now.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            created: Utc::now(),
        }
    }

    /// Append new turns, then trim to the most recent `max_history` messages.
    pub fn append_trimmed(&mut self, new_messages: Vec<ChatMessage>, max_history: usize) {
        self.messages.extend(new_messages);
        if self.messages.len() > max_history {
            let drop = self.messages.len() - max_history;
            self.messages.drain(..drop);
        }
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}
