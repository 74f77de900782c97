//! Cosine similarity scoring over the memory corpus.

use animus_core::memory::{MemoryItem, ScoredItem};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 =
/// opposite. Length mismatches are truncated to the shorter vector rather
/// than rejected; this policy tolerates corpora embedded with a different
/// model revision and is applied everywhere scoring happens. Returns 0.0 if
/// either vector is empty or zero — never NaN, never a division error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a[..len].iter().zip(b[..len].iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// The process-wide read-only memory corpus.
///
/// Owns the items for the lifetime of the process; safe to share across
/// requests without locking because nothing ever mutates it after load.
pub struct VectorStore {
    items: Vec<MemoryItem>,
}

impl VectorStore {
    pub fn new(items: Vec<MemoryItem>) -> Self {
        Self { items }
    }

    /// Total item count, including items without embeddings.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Score every embeddable item against a query embedding.
    ///
    /// Items with empty embeddings are silently skipped — a partially
    /// embedded corpus is valid, not an error. Results keep corpus order;
    /// ranking is the retriever's job.
    pub fn score<'a>(&'a self, query_embedding: &[f32]) -> Vec<ScoredItem<'a>> {
        self.items
            .iter()
            .filter(|item| item.has_embedding())
            .map(|item| ScoredItem {
                item,
                score: cosine_similarity(query_embedding, &item.embedding),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, embedding: Vec<f32>) -> MemoryItem {
        MemoryItem {
            id: id.into(),
            text: format!("snippet {id}"),
            category: "test".into(),
            embedding,
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = vec![0.3, -0.7, 0.2];
        let b = vec![0.9, 0.1, -0.4];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_scores_zero() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
    }

    #[test]
    fn cosine_empty_vectors() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[]), 0.0);
    }

    #[test]
    fn cosine_mismatched_lengths_truncate() {
        // Shorter vector wins: compare over 2 dims only
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 9.9];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] . [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1 => ~0.7071
        let a = vec![1.0, 1.0];
        let b = vec![1.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 0.7071).abs() < 0.001);
    }

    #[test]
    fn score_skips_items_without_embeddings() {
        let store = VectorStore::new(vec![
            item("a", vec![1.0, 0.0]),
            item("b", vec![]),
            item("c", vec![0.0, 1.0]),
        ]);

        let scored = store.score(&[1.0, 0.0]);
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].item.id, "a");
        assert_eq!(scored[1].item.id, "c");
    }

    #[test]
    fn score_preserves_corpus_order() {
        let store = VectorStore::new(vec![
            item("first", vec![1.0, 0.0]),
            item("second", vec![1.0, 0.0]),
        ]);

        let scored = store.score(&[0.0, 1.0]);
        assert_eq!(scored[0].item.id, "first");
        assert_eq!(scored[1].item.id, "second");
    }
}
