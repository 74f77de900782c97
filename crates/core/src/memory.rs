//! Memory corpus domain types.
//!
//! The corpus is a small set of persona memory snippets with precomputed
//! embedding vectors, loaded once at startup and shared read-only across all
//! requests.

use serde::{Deserialize, Serialize};

/// A single memory snippet with its precomputed embedding.
///
/// Immutable after load. An empty embedding is not an error — the item is
/// simply excluded from retrieval, which allows partially embedded corpora.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique ID within the corpus
    pub id: String,

    /// The snippet text injected into prompts
    pub text: String,

    /// Corpus category (older corpus files call this `type`)
    #[serde(alias = "type")]
    pub category: String,

    /// Precomputed embedding; may be empty
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl MemoryItem {
    /// Whether this item participates in similarity scoring.
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// A memory item paired with its similarity score for one query.
///
/// Transient — borrows from the corpus and is never persisted.
/// Score is in the cosine similarity domain [-1, 1].
#[derive(Debug, Clone, Copy)]
pub struct ScoredItem<'a> {
    pub item: &'a MemoryItem,
    pub score: f32,
}
