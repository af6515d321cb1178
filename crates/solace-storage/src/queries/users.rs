// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.
//!
//! The `profile` column is a JSON object of string values; it is decoded
//! into a `BTreeMap` at the row boundary so callers never see raw JSON.

use std::collections::BTreeMap;

use rusqlite::params;
use solace_core::types::User;
use solace_core::SolaceError;

use crate::database::{map_tr_err, now_iso, Database};

/// Insert a new user row. The caller must have lowercased the email.
///
/// A duplicate email surfaces as `InvalidInput` so the gateway can map it
/// to HTTP 400 instead of a 500.
pub async fn insert_user(db: &Database, user: &User) -> Result<(), SolaceError> {
    let user = user.clone();
    let profile_json = serde_json::to_string(&user.profile)
        .map_err(|e| SolaceError::Internal(format!("profile serialization: {e}")))?;

    let result = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, email, password_hash, profile, premium, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id,
                    user.email,
                    user.password_hash,
                    profile_json,
                    user.premium as i64,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            Ok(())
        })
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("users.email") => Err(SolaceError::InvalidInput(
            "email already registered".to_string(),
        )),
        Err(e) => Err(map_tr_err(e)),
    }
}

/// Fetch a user by id.
pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, SolaceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, password_hash, profile, premium, created_at, updated_at
                 FROM users WHERE id = ?1",
            )?;
            let user = stmt
                .query_row(params![id], row_to_user)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a user by (already lowercased) email.
pub async fn get_user_by_email(db: &Database, email: &str) -> Result<Option<User>, SolaceError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, password_hash, profile, premium, created_at, updated_at
                 FROM users WHERE email = ?1",
            )?;
            let user = stmt
                .query_row(params![email], row_to_user)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the profile mapping and bump `updated_at`.
pub async fn update_profile(
    db: &Database,
    id: &str,
    profile: &BTreeMap<String, String>,
) -> Result<(), SolaceError> {
    let id = id.to_string();
    let profile_json = serde_json::to_string(profile)
        .map_err(|e| SolaceError::Internal(format!("profile serialization: {e}")))?;

    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE users SET profile = ?1, updated_at = ?2 WHERE id = ?3",
                params![profile_json, now_iso(), id],
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)?;

    if updated == 0 {
        return Err(SolaceError::UserNotFound(
            "profile update for unknown user".to_string(),
        ));
    }
    Ok(())
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    let profile_json: String = row.get(3)?;
    let profile: BTreeMap<String, String> =
        serde_json::from_str(&profile_json).unwrap_or_default();
    let premium: i64 = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        profile,
        premium: premium != 0,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
