// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`Store`] implementation for deterministic tests.
//!
//! Mirrors the SQLite store's semantics (newest-first reads, CAS task
//! claiming, lowercased unique emails) without touching disk. Individual
//! operation groups can be made to fail on demand so committer tests can
//! prove best-effort behavior.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use solace_core::types::{EmotionEntry, HealthStatus, MemoryMessage, Task, User};
use solace_core::{SolaceError, Store, TaskStatus};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    emotions: HashMap<String, Vec<EmotionEntry>>,
    memory: HashMap<String, Vec<MemoryMessage>>,
    tasks: Vec<Task>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fail_memory: AtomicBool,
    fail_emotions: AtomicBool,
    fail_tasks: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every memory write fail until cleared.
    pub fn fail_memory_writes(&self, fail: bool) {
        self.fail_memory.store(fail, Ordering::SeqCst);
    }

    /// Makes every emotion write fail until cleared.
    pub fn fail_emotion_writes(&self, fail: bool) {
        self.fail_emotions.store(fail, Ordering::SeqCst);
    }

    /// Makes every task write fail until cleared.
    pub fn fail_task_writes(&self, fail: bool) {
        self.fail_tasks.store(fail, Ordering::SeqCst);
    }

    /// Convenience: inserts a plain user and returns its id.
    pub fn seed_user(&self, id: &str, email: &str) -> User {
        let now = now_iso();
        let user = User {
            id: id.to_string(),
            email: email.to_lowercase(),
            password_hash: "$argon2id$test".to_string(),
            profile: BTreeMap::new(),
            premium: false,
            created_at: now.clone(),
            updated_at: now,
        };
        self.inner
            .lock()
            .expect("store lock")
            .users
            .insert(id.to_string(), user.clone());
        user
    }

    /// All tasks, for assertions.
    pub fn all_tasks(&self) -> Vec<Task> {
        self.inner.lock().expect("store lock").tasks.clone()
    }
}

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn injected() -> SolaceError {
    SolaceError::Storage {
        source: "injected failure".into(),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn initialize(&self) -> Result<(), SolaceError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), SolaceError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, SolaceError> {
        Ok(HealthStatus::Healthy)
    }

    async fn create_user(&self, user: &User) -> Result<(), SolaceError> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(SolaceError::InvalidInput(
                "email already registered".to_string(),
            ));
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, SolaceError> {
        Ok(self.inner.lock().expect("store lock").users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SolaceError> {
        Ok(self
            .inner
            .lock()
            .expect("store lock")
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: &str,
        profile: &BTreeMap<String, String>,
    ) -> Result<(), SolaceError> {
        let mut inner = self.inner.lock().expect("store lock");
        let user = inner
            .users
            .get_mut(id)
            .ok_or_else(|| SolaceError::UserNotFound(id.to_string()))?;
        user.profile = profile.clone();
        user.updated_at = now_iso();
        Ok(())
    }

    async fn append_emotion(
        &self,
        user_id: &str,
        entry: &EmotionEntry,
    ) -> Result<(), SolaceError> {
        if self.fail_emotions.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner
            .lock()
            .expect("store lock")
            .emotions
            .entry(user_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn recent_emotions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<EmotionEntry>, SolaceError> {
        let inner = self.inner.lock().expect("store lock");
        let mut entries = inner.emotions.get(user_id).cloned().unwrap_or_default();
        entries.reverse(); // newest first
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn append_memory_pair(
        &self,
        user_id: &str,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), SolaceError> {
        if self.fail_memory.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let now = now_iso();
        let mut inner = self.inner.lock().expect("store lock");
        let messages = inner.memory.entry(user_id.to_string()).or_default();
        messages.push(MemoryMessage {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            role: "user".to_string(),
            content: user_content.to_string(),
            created_at: now.clone(),
        });
        messages.push(MemoryMessage {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            role: "assistant".to_string(),
            content: assistant_content.to_string(),
            created_at: now,
        });
        Ok(())
    }

    async fn recent_memory(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<MemoryMessage>, SolaceError> {
        let inner = self.inner.lock().expect("store lock");
        let mut messages = inner.memory.get(user_id).cloned().unwrap_or_default();
        messages.reverse(); // newest first
        messages.truncate(limit.max(0) as usize);
        Ok(messages)
    }

    async fn purge_expired_memory(&self, ttl_hours: i64) -> Result<u64, SolaceError> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::hours(ttl_hours))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        let mut purged = 0u64;
        let mut inner = self.inner.lock().expect("store lock");
        for messages in inner.memory.values_mut() {
            let before = messages.len();
            messages.retain(|m| m.created_at >= cutoff);
            purged += (before - messages.len()) as u64;
        }
        Ok(purged)
    }

    async fn create_task(&self, task: &Task) -> Result<(), SolaceError> {
        if self.fail_tasks.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner
            .lock()
            .expect("store lock")
            .tasks
            .push(task.clone());
        Ok(())
    }

    async fn dequeue_tasks(&self, limit: i64, now: &str) -> Result<Vec<Task>, SolaceError> {
        let mut inner = self.inner.lock().expect("store lock");
        let mut candidates: Vec<usize> = inner
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == TaskStatus::Queued && t.run_at.as_str() <= now)
            .map(|(i, _)| i)
            .collect();
        candidates.sort_by(|&a, &b| {
            let (ta, tb) = (&inner.tasks[a], &inner.tasks[b]);
            tb.priority
                .cmp(&ta.priority)
                .then(ta.created_at.cmp(&tb.created_at))
        });
        candidates.truncate(limit.max(0) as usize);

        let mut claimed = Vec::new();
        for i in candidates {
            inner.tasks[i].status = TaskStatus::Processing;
            claimed.push(inner.tasks[i].clone());
        }
        Ok(claimed)
    }

    async fn complete_task(&self, id: &str, result: &str) -> Result<(), SolaceError> {
        let mut inner = self.inner.lock().expect("store lock");
        if let Some(task) = inner.tasks.iter_mut().find(|t| t.id == id) {
            task.status = TaskStatus::Completed;
            task.result = Some(result.to_string());
        }
        Ok(())
    }

    async fn fail_task(&self, id: &str, result: &str) -> Result<(), SolaceError> {
        let mut inner = self.inner.lock().expect("store lock");
        if let Some(task) = inner.tasks.iter_mut().find(|t| t.id == id) {
            task.status = TaskStatus::Failed;
            task.result = Some(result.to_string());
        }
        Ok(())
    }

    async fn reset_stale_tasks(&self) -> Result<u64, SolaceError> {
        let mut inner = self.inner.lock().expect("store lock");
        let mut reset = 0u64;
        for task in inner.tasks.iter_mut() {
            if task.status == TaskStatus::Processing {
                task.status = TaskStatus::Queued;
                reset += 1;
            }
        }
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_pair_reads_newest_first() {
        let store = InMemoryStore::new();
        store.seed_user("u-1", "a@example.com");
        store.append_memory_pair("u-1", "q1", "a1").await.unwrap();
        store.append_memory_pair("u-1", "q2", "a2").await.unwrap();

        let memory = store.recent_memory("u-1", 2).await.unwrap();
        assert_eq!(memory[0].content, "a2");
        assert_eq!(memory[1].content, "q2");
    }

    #[tokio::test]
    async fn injected_memory_failure_only_affects_memory() {
        let store = InMemoryStore::new();
        store.seed_user("u-1", "a@example.com");
        store.fail_memory_writes(true);
        assert!(store.append_memory_pair("u-1", "q", "a").await.is_err());
        assert!(store
            .append_emotion(
                "u-1",
                &EmotionEntry {
                    emotion: "calm".into(),
                    intensity: None,
                    context: None,
                    created_at: now_iso(),
                }
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn dequeue_respects_priority_and_cas() {
        let store = InMemoryStore::new();
        store.seed_user("u-1", "a@example.com");
        for (id, priority) in [("low", 0), ("high", 9)] {
            store
                .create_task(&Task {
                    id: id.to_string(),
                    user_id: "u-1".to_string(),
                    task_type: "plan_day".to_string(),
                    parameters: serde_json::Map::new(),
                    status: TaskStatus::Queued,
                    priority,
                    created_at: now_iso(),
                    run_at: "2020-01-01T00:00:00.000Z".to_string(),
                    result: None,
                })
                .await
                .unwrap();
        }
        let batch = store.dequeue_tasks(10, &now_iso()).await.unwrap();
        assert_eq!(batch[0].id, "high");
        assert!(store.dequeue_tasks(10, &now_iso()).await.unwrap().is_empty());
    }
}
