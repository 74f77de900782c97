//! Shared test doubles for gateway tests.

use animus_core::backend::Backend;
use animus_core::error::BackendError;
use std::sync::Mutex;

/// A scripted backend: fixed generation output, optional fixed embedding,
/// and a recording of every system prompt it was asked to complete.
pub struct ScriptedBackend {
    answer: Result<String, BackendError>,
    embedding: Result<Vec<f32>, BackendError>,
    system_prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    /// Always answers with `text`; embeddings unavailable.
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            embedding: Err(BackendError::NotConfigured("no embedding scripted".into())),
            system_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Generation always fails with a network error.
    pub fn failing() -> Self {
        Self {
            answer: Err(BackendError::Network("backend down".into())),
            embedding: Err(BackendError::NotConfigured("no embedding scripted".into())),
            system_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Embed every query to a fixed vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Ok(embedding);
        self
    }

    /// Embedding calls fail with a network error.
    pub fn with_failing_embed(mut self) -> Self {
        self.embedding = Err(BackendError::Network("embed service down".into()));
        self
    }

    /// Every system prompt seen so far, in call order.
    pub fn system_prompts(&self) -> Vec<String> {
        self.system_prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, BackendError> {
        self.system_prompts
            .lock()
            .unwrap()
            .push(system_prompt.to_string());
        self.answer.clone()
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, BackendError> {
        self.embedding.clone()
    }
}
