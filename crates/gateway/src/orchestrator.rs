//! Per-request orchestration.
//!
//! One request walks ADMISSION → HISTORY_LOAD → RETRIEVAL → GENERATION →
//! PERSIST → RESPONSE. Only two stages can terminate the request early:
//! admission (rate limit) and generation (backend down). Retrieval and
//! persistence failures degrade: the request proceeds without memories, and
//! the answer is returned even if history could not be saved.

use animus_config::Persona;
use animus_core::backend::Backend;
use animus_core::error::BackendError;
use animus_core::message::{ChatMessage, SessionHistory, SessionId};
use animus_retrieval::Retriever;
use animus_store::{RateLimiter, SessionStore};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::prompt::{self, ChoiceReply, Mode};

/// A validated chat request, past the HTTP parsing layer.
#[derive(Debug, Clone)]
pub struct ChatTask {
    pub mode: Mode,
    pub message: String,
    pub options: Vec<String>,
    pub session_id: Option<SessionId>,
}

/// A successful orchestration outcome.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: ChatReply,
    pub session_id: SessionId,
}

/// What goes back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Chat { answer: String },
    Choice(ChoiceReply),
}

/// The two fatal request errors. Everything else degrades in place.
#[derive(Debug)]
pub enum RequestError {
    /// Rate limit exceeded; terminates at ADMISSION.
    AdmissionDenied { retry_after: std::time::Duration },

    /// Backend unavailable; terminates at GENERATION, before PERSIST.
    GenerationFailed(BackendError),
}

/// Everything a request needs, shared across requests.
///
/// The persona and corpus are read-only; the mutable state (counters,
/// histories) lives behind the durable store.
pub struct Orchestrator {
    pub persona: Persona,
    pub backend: Arc<dyn Backend>,
    pub retriever: Retriever,
    pub rate_limiter: RateLimiter,
    pub sessions: SessionStore,
    pub top_k: usize,
}

impl Orchestrator {
    /// Run one request through the state machine.
    ///
    /// `is_admin` skips ADMISSION entirely (the admin check happens at the
    /// HTTP layer, before any state is read or written).
    pub async fn handle(
        &self,
        task: ChatTask,
        client_key: &str,
        is_admin: bool,
    ) -> Result<ChatOutcome, RequestError> {
        // --- ADMISSION ---
        if !is_admin {
            match self.rate_limiter.admit(client_key).await {
                Ok(admission) if !admission.allowed => {
                    debug!(client = %client_key, "Rate limit exceeded");
                    return Err(RequestError::AdmissionDenied {
                        retry_after: admission.retry_after.unwrap_or_default(),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    // Fail open: a broken limiter store must not take the
                    // whole service down with it
                    warn!(error = %e, "Rate limiter store error, admitting request");
                }
            }
        }

        let session_id = task.session_id.clone().unwrap_or_default();

        // --- HISTORY_LOAD ---
        let history = match self.sessions.load(&session_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(session = %session_id, error = %e, "History load failed, starting fresh");
                SessionHistory::new()
            }
        };

        // --- RETRIEVAL (non-fatal) ---
        let memories = match self.retriever.retrieve_top_k(&task.message, self.top_k).await {
            Ok(memories) => memories,
            Err(e) => {
                warn!(error = %e, "Retrieval failed, continuing without memories");
                Vec::new()
            }
        };

        let system_prompt =
            prompt::build_system_prompt(&self.persona, &memories, task.mode, &history.messages);
        let user_prompt = prompt::build_user_prompt(&task.message, &task.options, task.mode);

        // --- GENERATION ---
        let raw = self
            .backend
            .generate(&system_prompt, &user_prompt)
            .await
            .map_err(|e| {
                error!(error = %e, "Generation failed");
                RequestError::GenerationFailed(e)
            })?;

        // --- PERSIST (best-effort) ---
        let turn = vec![
            ChatMessage::user(task.message.clone()),
            ChatMessage::assistant(raw.clone()),
        ];
        if let Err(e) = self.sessions.append(&session_id, history, turn).await {
            warn!(session = %session_id, error = %e, "Session persist failed, answer still returned");
        }

        // --- RESPONSE ---
        let reply = match task.mode {
            Mode::Chat => ChatReply::Chat { answer: raw },
            Mode::Choice => ChatReply::Choice(prompt::parse_choice(&raw)),
        };

        Ok(ChatOutcome { reply, session_id })
    }
}
