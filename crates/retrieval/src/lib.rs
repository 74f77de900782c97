//! In-memory vector retrieval for animus.
//!
//! The corpus is loaded once at startup and shared read-only across all
//! requests — no locking needed. Scoring is plain cosine similarity over
//! precomputed embeddings; ranking is a stable descending sort.

pub mod corpus;
pub mod retriever;
pub mod vector;

pub use corpus::load_corpus;
pub use retriever::Retriever;
pub use vector::{VectorStore, cosine_similarity};
