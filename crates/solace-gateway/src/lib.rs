// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP + SSE gateway for the Solace conversational core.
//!
//! Routes client requests through auth and the two-tier rate limiter
//! into the completion orchestrator, which streams upstream tokens back
//! over SSE, strips in-band metadata markers, and commits memory,
//! emotions, and tasks when the stream ends.

pub mod auth;
pub mod commit;
pub mod extract;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod orchestrator;
pub mod sanitize;
pub mod server;
pub mod sse;
pub mod tasks;

pub use orchestrator::{CompletionOptions, CompletionSettings, Orchestrator};
pub use server::{build_router, start_server, AppState};
