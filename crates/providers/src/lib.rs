//! LLM backend implementations for animus.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatBackend;

use animus_config::AppConfig;
use animus_core::Backend;
use animus_core::error::BackendError;
use std::sync::Arc;

/// Build the backend described by the configuration.
///
/// Fails fast when no API key is configured rather than producing a client
/// that errors on every request.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Backend>, BackendError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        BackendError::NotConfigured(
            "No API key configured — set ANIMUS_API_KEY or api_key in config.toml".into(),
        )
    })?;

    Ok(Arc::new(OpenAiCompatBackend::new(
        "openai_compat",
        &config.backend.api_url,
        api_key,
        &config.backend.chat_model,
        &config.backend.embed_model,
        config.backend.timeout_secs,
    )))
}
