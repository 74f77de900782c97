//! Prompt assembly and structured-choice parsing.
//!
//! String formatting only — the core never sees these strings, and nothing
//! here can fail. The system prompt merges the persona profile, the
//! retrieved memory snippets, and the session transcript; the mode
//! instruction tells the model whether to answer freely or emit strict
//! choice JSON.

use animus_config::Persona;
use animus_core::memory::MemoryItem;
use animus_core::message::{ChatMessage, Role};
use serde::Deserialize;

/// Request mode: free-form chat or pick-one-option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chat,
    Choice,
}

/// Build the system prompt for one request.
pub fn build_system_prompt(
    persona: &Persona,
    memories: &[MemoryItem],
    mode: Mode,
    history: &[ChatMessage],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are a character/persona modeled after {}, built from historical \
         records and psychological analysis.\n\
         You understand that you are not literally this person, but a simulation \
         designed to think and respond as they would have.\n\n\
         Character Profile:\n",
        persona.name
    ));

    if let Some(mbti) = &persona.mbti {
        prompt.push_str(&format!("MBTI: {mbti}\n"));
    }
    if let Some(iq) = persona.iq {
        prompt.push_str(&format!("Estimated IQ: {iq}\n"));
    }
    if !persona.short_profile.is_empty() {
        prompt.push_str(&persona.short_profile);
        prompt.push('\n');
    }

    if let Some(education) = &persona.education {
        prompt.push_str(&format!(
            "\nEducation & Intellectual Formation:\n- {}\n- Fields: {}\n",
            education.highest_level, education.field
        ));
        if !education.strengths.is_empty() {
            prompt.push_str(&format!("- Strengths: {}\n", education.strengths.join(", ")));
        }
    }

    if !memories.is_empty() {
        prompt.push_str("\nPersona Memory Snippets:\n");
        for (i, memory) in memories.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i + 1, memory.text));
        }
    }

    if !history.is_empty() {
        prompt.push_str("\n=== CURRENT CONVERSATION (Remember this context!) ===\n");
        for message in history {
            let speaker = match message.role {
                Role::User => "User",
                Role::Assistant => "You",
            };
            prompt.push_str(&format!("{speaker}: {}\n", message.content));
        }
        prompt.push_str("=== END CONVERSATION HISTORY ===\n");
    }

    if !persona.style_notes.is_empty() {
        prompt.push_str("\nGuidelines:\n");
        for note in &persona.style_notes {
            prompt.push_str(&format!("- {note}\n"));
        }
    }

    prompt.push_str(
        "\n- Use only the profile and memory snippets as factual knowledge\n\
         - If there is conversation history above, remember what the user told you\n",
    );

    if let Some(language) = &persona.response_language {
        prompt.push_str(&format!(
            "\nCRITICAL: You MUST respond in {language}. All your answers should be in \
             {language}.\n"
        ));
    }

    let mode_instruction = match mode {
        Mode::Chat => {
            "\nTask: Answer the user's message as this character would. Be thoughtful \
             and authentic to the character's documented personality."
        }
        Mode::Choice => {
            "\nTask: The user describes a situation and options. Choose exactly one \
             option that this character would most likely take, based on their \
             documented values and behavior patterns.\n\
             Return valid JSON only:\n\
             {\"choice\":\"A\",\"reason\":\"a short explanation grounded in this \
             character's values and personality\"}"
        }
    };
    prompt.push_str(mode_instruction);

    prompt
}

/// Build the user prompt: the raw message, with lettered options appended in
/// choice mode.
pub fn build_user_prompt(message: &str, options: &[String], mode: Mode) -> String {
    if mode == Mode::Chat || options.is_empty() {
        return message.to_string();
    }

    let listed = options
        .iter()
        .enumerate()
        .map(|(idx, opt)| format!("{}) {opt}", option_label(idx)))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{message}\n\nOptions:\n{listed}")
}

/// Label for the option at `idx`: A..Z, then 27, 28, ... past the alphabet.
fn option_label(idx: usize) -> String {
    if idx < 26 {
        ((b'A' + idx as u8) as char).to_string()
    } else {
        (idx + 1).to_string()
    }
}

/// Result of parsing the backend's output in choice mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceReply {
    /// The model produced well-formed `{choice, reason}` JSON.
    Parsed { choice: String, reason: String },
    /// Anything else: returned verbatim as a fallback, not an error.
    Raw(String),
}

#[derive(Deserialize)]
struct ChoicePayload {
    choice: String,
    reason: String,
}

/// Extract a structured choice from raw model output.
///
/// Models routinely wrap their JSON in prose or code fences, so this slices
/// from the first `{` to the last `}` before parsing. Output that still
/// doesn't yield string `choice` and `reason` fields becomes a raw
/// fallback.
pub fn parse_choice(raw: &str) -> ChoiceReply {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}'))
        && end > start
        && let Ok(payload) = serde_json::from_str::<ChoicePayload>(&raw[start..=end])
    {
        return ChoiceReply::Parsed {
            choice: payload.choice,
            reason: payload.reason,
        };
    }

    ChoiceReply::Raw(raw.to_string())
}
