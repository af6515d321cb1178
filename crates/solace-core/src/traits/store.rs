// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for users, memory, emotions, and tasks.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::SolaceError;
use crate::types::{EmotionEntry, HealthStatus, MemoryMessage, Task, User};

/// Durable storage for all Solace entities.
///
/// One backend implements the whole surface; the single trait keeps the
/// gateway state to one `Arc<dyn Store>` handle. Implementations must be
/// safe under concurrent calls.
#[async_trait]
pub trait Store: Send + Sync {
    /// Runs migrations and opens connections. Called once at startup.
    async fn initialize(&self) -> Result<(), SolaceError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), SolaceError>;

    /// Cheap liveness probe for the `/health` endpoint.
    async fn health_check(&self) -> Result<HealthStatus, SolaceError>;

    // --- Users ---

    /// Inserts a new user. The email must already be lowercased; a
    /// duplicate email is an `InvalidInput` error.
    async fn create_user(&self, user: &User) -> Result<(), SolaceError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, SolaceError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SolaceError>;

    /// Replaces the user's profile mapping and bumps `updated_at`.
    async fn update_profile(
        &self,
        id: &str,
        profile: &BTreeMap<String, String>,
    ) -> Result<(), SolaceError>;

    // --- Emotional log (append only) ---

    async fn append_emotion(&self, user_id: &str, entry: &EmotionEntry)
        -> Result<(), SolaceError>;

    /// Most recent entries first.
    async fn recent_emotions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<EmotionEntry>, SolaceError>;

    // --- Memory ---

    /// Appends the `(user, assistant)` turn pair in a single batch so a
    /// completion never leaves half a turn behind.
    async fn append_memory_pair(
        &self,
        user_id: &str,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), SolaceError>;

    /// Most recent messages first; callers reverse to chronological order.
    async fn recent_memory(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<MemoryMessage>, SolaceError>;

    /// Deletes memory older than `ttl_hours`. Returns the row count.
    async fn purge_expired_memory(&self, ttl_hours: i64) -> Result<u64, SolaceError>;

    // --- Tasks ---

    async fn create_task(&self, task: &Task) -> Result<(), SolaceError>;

    /// Claims up to `limit` runnable queued tasks, ordered by priority
    /// descending then creation time ascending, atomically transitioning
    /// each to `processing`. A task is claimed by exactly one caller.
    async fn dequeue_tasks(&self, limit: i64, now: &str) -> Result<Vec<Task>, SolaceError>;

    /// Transitions a `processing` task to `completed` with a result.
    async fn complete_task(&self, id: &str, result: &str) -> Result<(), SolaceError>;

    /// Transitions a `processing` task to `failed` with a reason.
    async fn fail_task(&self, id: &str, result: &str) -> Result<(), SolaceError>;

    /// Returns tasks stuck in `processing` to `queued` (crash recovery).
    async fn reset_stale_tasks(&self) -> Result<u64, SolaceError>;
}
