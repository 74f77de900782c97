//! Backend trait — the abstraction over the generation and embedding
//! services.
//!
//! The gateway calls `generate()` and `embed()` without knowing which
//! provider is behind them. Neither call is retried at this layer; both are
//! expected to fail fast (bounded timeout) rather than hang.

use crate::error::BackendError;
use async_trait::async_trait;

/// The LLM backend consumed by the gateway.
///
/// Implementations: OpenAI-compatible HTTP endpoints (covers OpenAI,
/// OpenRouter, Ollama, vLLM and most hosted gateways), scripted mocks in
/// tests.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Generate a completion for a system + user prompt pair.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, BackendError>;

    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;
}
