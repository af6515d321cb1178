// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived conversation memory operations.
//!
//! The `(user, assistant)` turn pair is written in one transaction so a
//! crash between the two inserts cannot leave half a turn behind. Reads
//! return newest first; the context assembler reverses to chronological
//! order. Rows past the TTL are deleted by [`purge_expired`].

use rusqlite::params;
use solace_core::types::MemoryMessage;
use solace_core::SolaceError;

use crate::database::{map_tr_err, now_iso, Database};

/// Append the user turn and the assistant turn as one batch.
///
/// Both rows share the same timestamp; the implicit rowid keeps the user
/// turn ordered strictly before the assistant turn.
pub async fn append_pair(
    db: &Database,
    user_id: &str,
    user_content: &str,
    assistant_content: &str,
) -> Result<(), SolaceError> {
    let user_id = user_id.to_string();
    let user_content = user_content.to_string();
    let assistant_content = assistant_content.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_iso();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO memory_messages (id, user_id, role, content, created_at)
                 VALUES (?1, ?2, 'user', ?3, ?4)",
                params![uuid::Uuid::new_v4().to_string(), user_id, user_content, now],
            )?;
            tx.execute(
                "INSERT INTO memory_messages (id, user_id, role, content, created_at)
                 VALUES (?1, ?2, 'assistant', ?3, ?4)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    user_id,
                    assistant_content,
                    now
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent messages first, rowid as tiebreak within one timestamp.
pub async fn recent_messages(
    db: &Database,
    user_id: &str,
    limit: i64,
) -> Result<Vec<MemoryMessage>, SolaceError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, role, content, created_at
                 FROM memory_messages WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                Ok(MemoryMessage {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete messages older than `ttl_hours`. Returns the deleted row count.
pub async fn purge_expired(db: &Database, ttl_hours: i64) -> Result<u64, SolaceError> {
    let cutoff = (chrono::Utc::now() - chrono::Duration::hours(ttl_hours))
        .format(crate::database::ISO_FMT)
        .to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM memory_messages WHERE created_at < ?1",
                params![cutoff],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}
