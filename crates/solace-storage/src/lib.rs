// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Solace gateway.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed CRUD
//! operations for users, the emotional log, short-lived conversation
//! memory, and the inferred-task queue.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::{now_iso, Database, ISO_FMT};
pub use store::SqliteStore;
