//! Persona profile loading.
//!
//! The persona is flexible textual profile data merged into the system
//! prompt. It is loaded once at startup into a plain immutable structure and
//! treated as opaque input by the rest of the system — the gateway formats
//! it, nothing interprets it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// A persona profile, typically loaded from `persona.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Display name, also reported by the health endpoint
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbti: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iq: Option<u32>,

    /// Short free-text character sketch
    #[serde(default)]
    pub short_profile: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,

    /// Language the persona must answer in (e.g. "Bahasa Indonesia")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_language: Option<String>,

    /// Free-form style guidelines appended to the system prompt
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_notes: Vec<String>,
}

/// Education and intellectual formation summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub highest_level: String,

    #[serde(default)]
    pub field: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
}

impl Persona {
    /// Load a persona profile from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Animus".into(),
            mbti: None,
            iq: None,
            short_profile: String::new(),
            education: None,
            response_language: None,
            style_notes: Vec::new(),
        }
    }
}
