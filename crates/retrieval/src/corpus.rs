//! Memory corpus loading.
//!
//! The corpus file is a JSON array of memory items with precomputed
//! embeddings (typically generated offline against the same embedding model
//! the gateway queries with).

use animus_core::error::{Error, RetrievalError};
use animus_core::memory::MemoryItem;
use std::path::Path;
use tracing::info;

use crate::vector::VectorStore;

/// Load a corpus file into a [`VectorStore`].
///
/// Items without embeddings are kept — the store skips them at scoring time
/// — so a partially embedded corpus loads cleanly.
pub fn load_corpus(path: &Path) -> Result<VectorStore, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Retrieval(RetrievalError::Corpus(format!(
            "failed to read {}: {e}",
            path.display()
        )))
    })?;

    let items: Vec<MemoryItem> = serde_json::from_str(&content).map_err(|e| {
        Error::Retrieval(RetrievalError::Corpus(format!(
            "failed to parse {}: {e}",
            path.display()
        )))
    })?;

    let embeddable = items.iter().filter(|i| i.has_embedding()).count();
    info!(
        total = items.len(),
        embeddable,
        "Memory corpus loaded from {}",
        path.display()
    );

    Ok(VectorStore::new(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_corpus_with_legacy_type_field() {
        let json = r#"[
            {"id": "m1", "text": "first snippet", "type": "biography", "embedding": [0.1, 0.2]},
            {"id": "m2", "text": "second snippet", "category": "quote", "embedding": []}
        ]"#;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let store = load_corpus(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        // Only the embedded item participates in scoring
        assert_eq!(store.score(&[1.0, 0.0]).len(), 1);
    }

    #[test]
    fn missing_file_is_a_corpus_error() {
        let result = load_corpus(Path::new("/nonexistent/corpus.json"));
        assert!(matches!(
            result,
            Err(Error::Retrieval(RetrievalError::Corpus(_)))
        ));
    }

    #[test]
    fn invalid_json_is_a_corpus_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not a list}").unwrap();

        assert!(load_corpus(file.path()).is_err());
    }
}
