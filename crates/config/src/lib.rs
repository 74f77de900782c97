//! Configuration loading, validation, and management for animus.
//!
//! Loads configuration from a TOML file with environment variable overrides
//! and validates all settings at startup.

pub mod persona;

pub use persona::{Education, Persona};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.animus/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend API key (env overrides take priority)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Backend configuration (endpoint + models)
    #[serde(default)]
    pub backend: BackendConfig,

    /// Gateway (HTTP surface) configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Rate limiter configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Session store configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Memory retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Durable key-value store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Persona data file locations
    #[serde(default)]
    pub persona: PersonaConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("backend", &self.backend)
            .field("gateway", &self.gateway)
            .field("rate_limit", &self.rate_limit)
            .field("session", &self.session)
            .field("retrieval", &self.retrieval)
            .field("store", &self.store)
            .field("persona", &self.persona)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Chat completion model
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embedding model
    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    /// Per-call timeout in seconds. External calls fail past this bound,
    /// they never hang.
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_chat_model() -> String {
    "meta-llama/llama-3-8b-instruct".into()
}
fn default_embed_model() -> String {
    "baai/bge-small-en-v1.5".into()
}
fn default_backend_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            chat_model: default_chat_model(),
            embed_model: default_embed_model(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Exact-match admin secret for the `X-Admin-Key` header. Requests that
    /// present it bypass rate limiting entirely. None disables the bypass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8787
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("admin_key", &redact(&self.admin_key))
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_key: None,
        }
    }
}

/// Fixed-window rate limiter settings.
///
/// Note the fixed-window shape is part of the external contract: a client
/// can burst up to 2x `max_requests` across a window boundary. Tightening
/// that changes observed throughput limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

fn default_window_secs() -> u64 {
    60
}
fn default_max_requests() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session TTL; refreshed on every append so active sessions stay alive
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Maximum messages kept per session
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_session_ttl() -> u64 {
    1800
}
fn default_max_history() -> usize {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            max_history: default_max_history(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many memory snippets to inject into the prompt
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Key-value backend: "memory" or "sqlite"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database path (ignored by the memory backend)
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_backend() -> String {
    "memory".into()
}
fn default_store_path() -> String {
    "animus-kv.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Persona profile JSON file
    #[serde(default = "default_profile_path")]
    pub profile_path: String,

    /// Memory corpus JSON file (array of items with embeddings)
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,
}

fn default_profile_path() -> String {
    "persona.json".into()
}
fn default_corpus_path() -> String {
    "persona_vectors.json".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            profile_path: default_profile_path(),
            corpus_path: default_corpus_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.animus/config.toml).
    ///
    /// Environment variable overrides, highest priority first:
    /// - `ANIMUS_API_KEY`, then `OPENROUTER_API_KEY`, then `OPENAI_API_KEY`
    /// - `ANIMUS_ADMIN_KEY`
    /// - `ANIMUS_MODEL` (chat model)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        if config.api_key.is_none() {
            config.api_key = std::env::var("ANIMUS_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(admin_key) = std::env::var("ANIMUS_ADMIN_KEY") {
            config.gateway.admin_key = Some(admin_key);
        }

        if let Ok(model) = std::env::var("ANIMUS_MODEL") {
            config.backend.chat_model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".animus")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.window_secs must be > 0".into(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.max_requests must be > 0".into(),
            ));
        }
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.ttl_secs must be > 0".into(),
            ));
        }
        if self.session.max_history == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_history must be > 0".into(),
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend.timeout_secs must be > 0".into(),
            ));
        }
        match self.store.backend.as_str() {
            "memory" | "sqlite" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "store.backend must be \"memory\" or \"sqlite\", got \"{other}\""
                )));
            }
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            backend: BackendConfig::default(),
            gateway: GatewayConfig::default(),
            rate_limit: RateLimitConfig::default(),
            session: SessionConfig::default(),
            retrieval: RetrievalConfig::default(),
            store: StoreConfig::default(),
            persona: PersonaConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
