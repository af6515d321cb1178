// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Solace workspace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by store and upstream probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

// --- Users ---

/// An account row. `password_hash` never leaves the store boundary
/// except inside this struct; the gateway strips it before responding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Unique, lowercased at write.
    pub email: String,
    /// Argon2id PHC string. Never serialized into API responses.
    pub password_hash: String,
    /// Free-form string-to-string profile fields.
    pub profile: BTreeMap<String, String>,
    /// Subscription flag read by the gateway, never mutated by it.
    pub premium: bool,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
}

/// One append-only entry in a user's emotional log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEntry {
    /// Emotion label, non-empty.
    pub emotion: String,
    /// Intensity in [1,10] when present.
    pub intensity: Option<i64>,
    /// Optional free-form context.
    pub context: Option<String>,
    /// ISO 8601 timestamp at server clock.
    pub created_at: String,
}

// --- Memory ---

/// A short-lived conversation memory message. Rows older than the
/// configured TTL are purged by the background sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMessage {
    /// Unique message identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// "user" or "assistant". Other roles are dropped at assembly.
    pub role: String,
    /// Message content, non-empty.
    pub content: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

// --- Tasks ---

/// Lifecycle of an inferred task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// A durable inferred task. The committer only ever creates `Queued`
/// tasks; the runner owns every later transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Task type, e.g. "plan_day".
    pub task_type: String,
    /// JSON parameter object.
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// 0-10, higher runs first. Default 0.
    pub priority: i64,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// Earliest ISO 8601 timestamp at which the task may run.
    pub run_at: String,
    /// Outcome string once completed or failed.
    pub result: Option<String>,
}

// --- Extracted metadata ---

/// An emotion inferred by the model via an in-band `EMOTION_LOG` marker,
/// already normalized (intensity clamped to [1,10] or dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredEmotion {
    pub emotion: String,
    pub intensity: Option<i64>,
    pub context: Option<String>,
}

/// A task inferred by the model via an in-band `TASK_INFERENCE` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredTask {
    pub task_type: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

// --- Upstream wire ---

/// One role-tagged message in the prompt sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// One `{content}` payload from the upstream token stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub content: String,
}

/// A fully assembled upstream completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub n_predict: u32,
    pub temperature: f32,
    pub stream: bool,
}

// --- Intelligence context ---

/// Four-layer behavioral context blob. Opaque to everything except the
/// compressor, which clusters and compresses it into a tagged summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntelligenceContext {
    /// Current state: emotions, message complexity.
    #[serde(default)]
    pub micro: serde_json::Value,
    /// Trends and interaction patterns.
    #[serde(default)]
    pub medium: serde_json::Value,
    /// Personality and cognitive style.
    #[serde(default, rename = "macro")]
    pub macro_: serde_json::Value,
    /// Current-moment synthesis.
    #[serde(default)]
    pub synthesis: serde_json::Value,
}
