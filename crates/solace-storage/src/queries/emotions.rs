// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only emotional log operations.

use rusqlite::params;
use solace_core::types::EmotionEntry;
use solace_core::SolaceError;

use crate::database::{map_tr_err, Database};

/// Append one emotion entry. Entries are never edited or deleted.
pub async fn append_emotion(
    db: &Database,
    user_id: &str,
    entry: &EmotionEntry,
) -> Result<(), SolaceError> {
    let user_id = user_id.to_string();
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO emotions (user_id, emotion, intensity, context, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user_id,
                    entry.emotion,
                    entry.intensity,
                    entry.context,
                    entry.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent entries first.
pub async fn recent_emotions(
    db: &Database,
    user_id: &str,
    limit: i64,
) -> Result<Vec<EmotionEntry>, SolaceError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT emotion, intensity, context, created_at
                 FROM emotions WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                Ok(EmotionEntry {
                    emotion: row.get(0)?,
                    intensity: row.get(1)?,
                    context: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}
