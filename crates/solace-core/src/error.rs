// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Solace gateway core.

use thiserror::Error;

/// The primary error type used across all Solace crates.
///
/// Upstream failures are split into four variants so the completion
/// orchestrator can distinguish connect-level problems (reportable as
/// HTTP 502 before the stream opens) from mid-stream ones (reportable
/// only in-band once SSE headers have been written).
#[derive(Debug, Error)]
pub enum SolaceError {
    /// Request payload failed validation (empty prompt, bad email, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing or unverifiable credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A rate-limit window rejected the request.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The referenced user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Could not reach the upstream model endpoint (connect/TLS/DNS).
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream produced no bytes within the configured window.
    #[error("upstream timed out after {duration:?}")]
    UpstreamTimeout { duration: std::time::Duration },

    /// The upstream byte stream violated the SSE framing contract.
    #[error("upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// The upstream answered with a non-2xx status before streaming began.
    #[error("upstream returned status {code}: {body}")]
    UpstreamStatus { code: u16, body: String },

    /// One or more post-completion side-effect writes failed.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SolaceError {
    /// True when the error occurred before any upstream byte was produced,
    /// meaning it can still be reported as a plain HTTP status.
    pub fn is_pre_stream(&self) -> bool {
        matches!(
            self,
            SolaceError::InvalidInput(_)
                | SolaceError::Unauthorized(_)
                | SolaceError::RateLimited { .. }
                | SolaceError::UserNotFound(_)
                | SolaceError::UpstreamUnavailable(_)
                | SolaceError::UpstreamStatus { .. }
        )
    }
}
