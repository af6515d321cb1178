// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inferred-task queue operations.
//!
//! Dequeue uses a compare-and-set on the prior status inside one
//! transaction, so a task in `processing` is owned by exactly one worker
//! even when several drains race.

use std::str::FromStr;

use rusqlite::params;
use solace_core::types::{Task, TaskStatus};
use solace_core::SolaceError;

#[cfg(test)]
use crate::database::now_iso;
use crate::database::{map_tr_err, Database};

/// Insert a new task. The committer only ever creates `queued` tasks.
pub async fn insert_task(db: &Database, task: &Task) -> Result<(), SolaceError> {
    let task = task.clone();
    let parameters_json = serde_json::to_string(&task.parameters)
        .map_err(|e| SolaceError::Internal(format!("task parameter serialization: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, user_id, task_type, parameters, status, priority, created_at, run_at, result)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    task.id,
                    task.user_id,
                    task.task_type,
                    parameters_json,
                    task.status.to_string(),
                    task.priority,
                    task.created_at,
                    task.run_at,
                    task.result,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim up to `limit` runnable queued tasks.
///
/// Candidates are ordered `priority DESC, created_at ASC`; each is
/// transitioned `queued -> processing` with a guarded UPDATE. A row
/// another worker claimed between SELECT and UPDATE is skipped.
pub async fn dequeue_batch(
    db: &Database,
    limit: i64,
    now: &str,
) -> Result<Vec<Task>, SolaceError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let candidates: Vec<Task> = {
                let mut stmt = tx.prepare(
                    "SELECT id, user_id, task_type, parameters, status, priority, created_at, run_at, result
                     FROM tasks
                     WHERE status = 'queued' AND run_at <= ?1
                     ORDER BY priority DESC, created_at ASC
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![now, limit], row_to_task)?;
                let mut tasks = Vec::new();
                for row in rows {
                    tasks.push(row?);
                }
                tasks
            };

            let mut claimed = Vec::new();
            for mut task in candidates {
                let changed = tx.execute(
                    "UPDATE tasks SET status = 'processing' WHERE id = ?1 AND status = 'queued'",
                    params![task.id],
                )?;
                if changed == 1 {
                    task.status = TaskStatus::Processing;
                    claimed.push(task);
                }
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a terminal state with a result string.
pub async fn finish_task(
    db: &Database,
    id: &str,
    status: TaskStatus,
    result: &str,
) -> Result<(), SolaceError> {
    let id = id.to_string();
    let status = status.to_string();
    let result = result.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = ?1, result = ?2 WHERE id = ?3",
                params![status, result, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Return tasks stuck in `processing` to `queued` (restart recovery).
pub async fn reset_stale_processing(db: &Database) -> Result<u64, SolaceError> {
    db.connection()
        .call(|conn| {
            let n = conn.execute(
                "UPDATE tasks SET status = 'queued' WHERE status = 'processing'",
                [],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, rusqlite::Error> {
    let parameters_json: String = row.get(3)?;
    let parameters = serde_json::from_str(&parameters_json).unwrap_or_default();
    let status_str: String = row.get(4)?;
    let status = TaskStatus::from_str(&status_str).unwrap_or(TaskStatus::Failed);
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_type: row.get(2)?,
        parameters,
        status,
        priority: row.get(5)?,
        created_at: row.get(6)?,
        run_at: row.get(7)?,
        result: row.get(8)?,
    })
}
