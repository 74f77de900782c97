//! Error types for the animus domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all animus operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Backend errors (generation / embedding services) ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Durable store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the generation / embedding backend.
///
/// Neither service is retried at this layer; failures propagate to the
/// orchestrator which decides whether the request degrades or aborts.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Malformed backend response: {0}")]
    InvalidResponse(String),
}

/// Errors from the durable key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt record for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Errors during memory retrieval.
///
/// A retrieval failure is recoverable by design: the orchestrator proceeds
/// with an empty memory set rather than aborting the request.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding lookup failed: {0}")]
    Embedding(#[from] BackendError),

    #[error("Corpus error: {0}")]
    Corpus(String),
}
