//! Top-K nearest-neighbor retrieval over the memory corpus.

use animus_core::backend::Backend;
use animus_core::error::RetrievalError;
use animus_core::memory::MemoryItem;
use std::sync::Arc;
use tracing::debug;

use crate::vector::VectorStore;

/// Ranks corpus items against a query and returns the K best.
pub struct Retriever {
    backend: Arc<dyn Backend>,
    corpus: Arc<VectorStore>,
}

impl Retriever {
    pub fn new(backend: Arc<dyn Backend>, corpus: Arc<VectorStore>) -> Self {
        Self { backend, corpus }
    }

    /// Retrieve the top-K memory items for a query text.
    ///
    /// Embeds the query via the backend, scores every embeddable corpus
    /// item, sorts descending by similarity (stable, so ties keep corpus
    /// order), and takes the first `k`. An embedding failure propagates as
    /// a [`RetrievalError`]; the caller decides whether to degrade.
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<MemoryItem>, RetrievalError> {
        let query_embedding = self.backend.embed(query).await?;

        let mut scored = self.corpus.score(&query_embedding);
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            candidates = scored.len(),
            k,
            top_score = scored.first().map(|s| s.score).unwrap_or(0.0),
            "Retrieval ranked corpus"
        );

        Ok(scored
            .into_iter()
            .take(k)
            .map(|s| s.item.clone())
            .collect())
    }
}
