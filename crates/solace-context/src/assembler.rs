// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the ordered message list sent upstream:
//! `[system, ...history oldest first, current user turn]`.
//!
//! The system message carries the product persona, the user's profile,
//! a summary of their strongest recent emotions, the optional compressed
//! intelligence section, and the grammar for in-band metadata markers.

use std::collections::BTreeMap;

use solace_core::types::{ChatMessage, EmotionEntry, MemoryMessage};

/// Product persona. Asserts the Solace identity and forbids references
/// to any underlying model or provider.
const PERSONA: &str = "You are Solace, a warm and attentive AI companion. You listen closely, \
remember what matters to the person you are talking with, and answer in a \
natural, supportive voice. You are Solace and nothing else: never mention \
or hint at any underlying model, engine, vendor, or provider, and never \
describe yourself as a language model.";

/// Instruction grammar for the in-band metadata markers. The gateway
/// strips these from the visible reply before it reaches the client.
const MARKER_GRAMMAR: &str = "When the conversation reveals a clear emotional state, append exactly one line:\n\
EMOTION_LOG: {\"emotion\":\"<label>\",\"intensity\":<1-10>,\"context\":\"<short note>\"}\n\
When the user implies something actionable to do later, append exactly one line:\n\
TASK_INFERENCE: {\"taskType\":\"<name>\",\"parameters\":{}}\n\
These lines are consumed by the system and are never shown to the user.";

/// Inputs for one assembly. `history` is newest first, as read from the
/// store; the assembler reverses it to chronological order.
pub struct AssemblerInput<'a> {
    pub profile: &'a BTreeMap<String, String>,
    pub history: &'a [MemoryMessage],
    pub emotions: &'a [EmotionEntry],
    pub prompt: &'a str,
    /// Pre-compressed intelligence summary, already within budget.
    pub intelligence: Option<&'a str>,
}

/// Builds the full ordered message list for one completion.
pub fn assemble(input: AssemblerInput<'_>) -> Vec<ChatMessage> {
    let mut system = String::from(PERSONA);

    if let Some(summary) = input.intelligence {
        if !summary.is_empty() {
            system.push_str("\n\n[CONTEXT] ");
            system.push_str(summary);
            system.push_str(" [/CONTEXT]");
        }
    }

    if !input.profile.is_empty() {
        system.push_str("\n\nWhat you know about this person:");
        for (key, value) in input.profile {
            system.push_str(&format!("\n- {key}: {value}"));
        }
    }

    let emotion_summary = top_emotions(input.emotions, 3);
    if !emotion_summary.is_empty() {
        system.push_str("\n\nRecent emotional notes: ");
        system.push_str(&emotion_summary);
    }

    let history: Vec<&MemoryMessage> = input
        .history
        .iter()
        .rev() // newest-first storage order -> chronological
        .filter(|m| m.role == "user" || m.role == "assistant")
        .collect();

    if !history.is_empty() {
        system.push_str("\n\nThe recent conversation continues below.");
    }

    system.push_str("\n\n");
    system.push_str(MARKER_GRAMMAR);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new("system", system));
    for m in history {
        messages.push(ChatMessage::new(m.role.clone(), m.content.clone()));
    }
    messages.push(ChatMessage::new("user", input.prompt));
    messages
}

/// Formats the strongest recent emotions as `label(intensity)` pairs.
/// Entries are already newest first; the first `n` are taken.
fn top_emotions(emotions: &[EmotionEntry], n: usize) -> String {
    emotions
        .iter()
        .take(n)
        .map(|e| match e.intensity {
            Some(i) => format!("{}({i})", e.emotion),
            None => e.emotion.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
