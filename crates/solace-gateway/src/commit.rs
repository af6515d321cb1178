// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Side-effect committer.
//!
//! After the terminal `[DONE]` has been written, the orchestrator hands
//! the completion's durable effects here: the memory pair, the inferred
//! emotion, and the inferred task. The three writes run in parallel and
//! are best-effort: one failing never blocks the others, failures are
//! logged and metered, and the client is never told. The user cache entry
//! is invalidated afterwards so the next read observes the new pair.

use tracing::{error, info};

use solace_context::UserCache;
use solace_core::types::{EmotionEntry, InferredEmotion, InferredTask, Task};
use solace_core::{Store, TaskStatus};

use crate::metrics;

/// Timestamp format shared with the store's columns.
pub(crate) fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Everything one completion wants persisted.
#[derive(Debug, Clone)]
pub struct CommitInput {
    pub user_id: String,
    pub user_prompt: String,
    pub assistant_content: String,
    pub emotion: Option<InferredEmotion>,
    pub task: Option<InferredTask>,
}

/// Commits all side-effects. Returns true when every applicable write
/// succeeded.
pub async fn commit_side_effects(
    store: &dyn Store,
    cache: &UserCache,
    input: CommitInput,
) -> bool {
    let user_id = input.user_id.clone();

    let memory = async {
        store
            .append_memory_pair(&input.user_id, &input.user_prompt, &input.assistant_content)
            .await
    };

    let emotion = async {
        match &input.emotion {
            Some(inferred) if !inferred.emotion.is_empty() => {
                let entry = EmotionEntry {
                    emotion: inferred.emotion.clone(),
                    intensity: inferred.intensity,
                    context: inferred.context.clone(),
                    created_at: now_iso(),
                };
                store.append_emotion(&input.user_id, &entry).await.map(|()| true)
            }
            _ => Ok(false),
        }
    };

    let task = async {
        match &input.task {
            Some(inferred) if !inferred.task_type.is_empty() => {
                let now = now_iso();
                let task = Task {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: input.user_id.clone(),
                    task_type: inferred.task_type.clone(),
                    parameters: inferred.parameters.clone(),
                    status: TaskStatus::Queued,
                    priority: 0,
                    created_at: now.clone(),
                    run_at: now,
                    result: None,
                };
                store.create_task(&task).await.map(|()| true)
            }
            _ => Ok(false),
        }
    };

    let (memory_result, emotion_result, task_result) = tokio::join!(memory, emotion, task);

    let mut all_ok = true;
    if let Err(e) = &memory_result {
        error!(user_id = %user_id, error = %e, "memory pair commit failed");
        metrics::record_commit_failure("memory");
        all_ok = false;
    }
    if let Err(e) = &emotion_result {
        error!(user_id = %user_id, error = %e, "emotion commit failed");
        metrics::record_commit_failure("emotion");
        all_ok = false;
    }
    if let Err(e) = &task_result {
        error!(user_id = %user_id, error = %e, "task commit failed");
        metrics::record_commit_failure("task");
        all_ok = false;
    }

    cache.invalidate(&user_id);

    info!(
        user_id = %user_id,
        emotion = matches!(emotion_result, Ok(true)),
        task = matches!(task_result, Ok(true)),
        ok = all_ok,
        "completion side-effects committed"
    );
    all_ok
}
