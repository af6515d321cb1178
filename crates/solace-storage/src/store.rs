// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`Store`] trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use solace_core::types::{EmotionEntry, HealthStatus, MemoryMessage, Task, User};
use solace_core::{SolaceError, Store};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call
/// to [`Store::initialize`].
pub struct SqliteStore {
    database_path: String,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore pointing at the given path.
    ///
    /// The connection is not opened until [`Store::initialize`] is called.
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, SolaceError> {
        self.db.get().ok_or_else(|| SolaceError::Storage {
            source: "store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn initialize(&self) -> Result<(), SolaceError> {
        let db = Database::open(&self.database_path).await?;
        self.db.set(db).map_err(|_| SolaceError::Storage {
            source: "store already initialized".into(),
        })?;

        // Restart recovery: a processing task whose worker died stays
        // stuck forever unless requeued here.
        let requeued = queries::tasks::reset_stale_processing(self.db()?).await?;
        if requeued > 0 {
            debug!(requeued, "stale processing tasks returned to queue");
        }

        debug!(path = %self.database_path, "sqlite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SolaceError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, SolaceError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    // --- Users ---

    async fn create_user(&self, user: &User) -> Result<(), SolaceError> {
        queries::users::insert_user(self.db()?, user).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, SolaceError> {
        queries::users::get_user(self.db()?, id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SolaceError> {
        queries::users::get_user_by_email(self.db()?, email).await
    }

    async fn update_profile(
        &self,
        id: &str,
        profile: &BTreeMap<String, String>,
    ) -> Result<(), SolaceError> {
        queries::users::update_profile(self.db()?, id, profile).await
    }

    // --- Emotional log ---

    async fn append_emotion(
        &self,
        user_id: &str,
        entry: &EmotionEntry,
    ) -> Result<(), SolaceError> {
        queries::emotions::append_emotion(self.db()?, user_id, entry).await
    }

    async fn recent_emotions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<EmotionEntry>, SolaceError> {
        queries::emotions::recent_emotions(self.db()?, user_id, limit).await
    }

    // --- Memory ---

    async fn append_memory_pair(
        &self,
        user_id: &str,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), SolaceError> {
        queries::memory::append_pair(self.db()?, user_id, user_content, assistant_content).await
    }

    async fn recent_memory(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<MemoryMessage>, SolaceError> {
        queries::memory::recent_messages(self.db()?, user_id, limit).await
    }

    async fn purge_expired_memory(&self, ttl_hours: i64) -> Result<u64, SolaceError> {
        queries::memory::purge_expired(self.db()?, ttl_hours).await
    }

    // --- Tasks ---

    async fn create_task(&self, task: &Task) -> Result<(), SolaceError> {
        queries::tasks::insert_task(self.db()?, task).await
    }

    async fn dequeue_tasks(&self, limit: i64, now: &str) -> Result<Vec<Task>, SolaceError> {
        queries::tasks::dequeue_batch(self.db()?, limit, now).await
    }

    async fn complete_task(&self, id: &str, result: &str) -> Result<(), SolaceError> {
        queries::tasks::finish_task(self.db()?, id, solace_core::TaskStatus::Completed, result)
            .await
    }

    async fn fail_task(&self, id: &str, result: &str) -> Result<(), SolaceError> {
        queries::tasks::finish_task(self.db()?, id, solace_core::TaskStatus::Failed, result).await
    }

    async fn reset_stale_tasks(&self) -> Result<u64, SolaceError> {
        queries::tasks::reset_stale_processing(self.db()?).await
    }
}
