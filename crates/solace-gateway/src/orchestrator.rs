// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion orchestrator: the state machine driving one completion.
//!
//! `Accepted -> Prepared -> Streaming -> Draining -> Committing -> Done`,
//! with terminal outcomes for limit/input rejection, upstream failure,
//! client disconnect, and internal errors.
//!
//! Policies owned here:
//! - hard stream timer and no-byte timer (reset on each non-empty delta)
//! - the delta cap that bounds the metadata buffer
//! - stop-sequence scanning over the accumulated buffer
//! - marker filtering with prefix hold-back, so a marker split across
//!   chunks never reaches the wire
//! - commit strictly after the last client-visible byte; a disconnect
//!   still commits so the user never experiences amnesia

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use solace_config::model::CompletionConfig;
use solace_context::{
    assemble, compress, AssemblerInput, CompressionCache, CompressionParams, UserCache,
};
use solace_core::types::{CompletionRequest, IntelligenceContext};
use solace_core::{DeltaStream, SolaceError, Store, UpstreamClient};

use crate::commit::{commit_side_effects, CommitInput};
use crate::extract::{extract_metadata, EMOTION_MARKER, TASK_MARKER};
use crate::limiter::{RateLimiter, Scope};
use crate::metrics;
use crate::sanitize::sanitize;
use crate::sse::RelayFrame;

/// Stop sequences matched as substrings of the accumulated buffer.
/// Content at and after the earliest match is dropped.
pub const STOP_SEQUENCES: &[&str] = &[
    "USER:",
    "Human:",
    "Assistant:",
    "[INST]",
    "[/INST]",
    "<s>",
    "</s>",
    "---",
    "***",
    "\n\n\n\n",
    "Example:",
    "Note:",
    "Source:",
];

/// Pipeline states, surfaced in tracing spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Accepted,
    Prepared,
    Streaming,
    Draining,
    Committing,
    Done,
}

impl std::fmt::Display for CompletionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompletionState::Accepted => "accepted",
            CompletionState::Prepared => "prepared",
            CompletionState::Streaming => "streaming",
            CompletionState::Draining => "draining",
            CompletionState::Committing => "committing",
            CompletionState::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Locked-in pipeline knobs, derived from config once at startup.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub stream_timeout: Duration,
    pub first_byte_timeout: Duration,
    pub token_cap: u32,
    pub max_predict: u32,
    pub max_temperature: f32,
    pub history_window: i64,
    pub task_batch: i64,
}

impl CompletionSettings {
    pub fn from_config(config: &CompletionConfig, model: &str) -> Self {
        Self {
            model: model.to_string(),
            stream_timeout: Duration::from_secs(config.stream_timeout_secs),
            first_byte_timeout: Duration::from_secs(config.first_byte_timeout_secs),
            token_cap: config.token_cap,
            max_predict: config.max_predict,
            max_temperature: config.max_temperature,
            history_window: config.history_window,
            task_batch: config.task_batch,
        }
    }
}

/// Per-request options accepted from the client.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub message_type: Option<String>,
    pub complexity: Option<f64>,
    pub intelligence: Option<IntelligenceContext>,
    pub n_predict: Option<u32>,
    pub temperature: Option<f32>,
}

/// Everything locked in before the upstream opens.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub request_id: String,
    pub user_id: String,
    pub prompt: String,
    pub request: CompletionRequest,
}

/// Result of driving one stream to its end.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    /// Sanitized assistant content, as committed to memory.
    pub content: String,
    /// Terminal outcome label for metrics.
    pub outcome: &'static str,
}

/// The orchestrator. One instance serves every request.
pub struct Orchestrator {
    store: Arc<dyn Store>,
    upstream: Arc<dyn UpstreamClient>,
    user_cache: Arc<UserCache>,
    comp_cache: Arc<CompressionCache>,
    limiter: Arc<RateLimiter>,
    settings: CompletionSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        upstream: Arc<dyn UpstreamClient>,
        user_cache: Arc<UserCache>,
        comp_cache: Arc<CompressionCache>,
        limiter: Arc<RateLimiter>,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            store,
            upstream,
            user_cache,
            comp_cache,
            limiter,
            settings,
        }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// `Accepted -> Prepared`: validate, rate-limit, load context, and
    /// lock in the upstream request.
    pub async fn prepare(
        &self,
        user_id: &str,
        prompt: &str,
        opts: CompletionOptions,
    ) -> Result<Prepared, SolaceError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SolaceError::InvalidInput("prompt must not be empty".into()));
        }
        self.limiter.check(Scope::Completion, user_id).map_err(|e| {
            metrics::record_rate_limited("completion");
            e
        })?;

        // Load profile + recent memory through the cache.
        let (user, memory) = match self.user_cache.get(user_id) {
            Some(cached) => (cached.user, cached.recent_memory),
            None => {
                let user = self
                    .store
                    .get_user(user_id)
                    .await?
                    .ok_or_else(|| SolaceError::UserNotFound(user_id.to_string()))?;
                let memory = self
                    .store
                    .recent_memory(user_id, self.settings.history_window)
                    .await?;
                self.user_cache.insert(user.clone(), memory.clone());
                (user, memory)
            }
        };
        let emotions = self.store.recent_emotions(user_id, 3).await?;

        // Compress the intelligence context when one was supplied.
        let message_type = opts
            .message_type
            .unwrap_or_else(|| "standard".to_string());
        let complexity = opts.complexity.unwrap_or(5.0);
        let compressed = opts.intelligence.as_ref().map(|ctx| {
            if let Some(hit) =
                self.comp_cache
                    .get(user_id, &message_type, complexity, &self.settings.model)
            {
                return hit;
            }
            let params = CompressionParams {
                message_type: message_type.clone(),
                complexity,
                history_len: memory.len(),
                model: self.settings.model.clone(),
                forced_strategy: None,
            };
            let result = compress(ctx, &params);
            self.comp_cache.put(
                user_id,
                &message_type,
                complexity,
                &self.settings.model,
                result.clone(),
            );
            result
        });

        let messages = assemble(AssemblerInput {
            profile: &user.profile,
            history: &memory,
            emotions: &emotions,
            prompt,
            intelligence: compressed
                .as_ref()
                .map(|c| c.text.as_str())
                .filter(|t| !t.is_empty()),
        });

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            n_predict: opts
                .n_predict
                .unwrap_or(self.settings.max_predict)
                .min(self.settings.max_predict),
            temperature: opts
                .temperature
                .unwrap_or(0.7)
                .min(self.settings.max_temperature),
            stream: true,
        };

        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(
            request_id = %request_id,
            user_id,
            state = %CompletionState::Prepared,
            messages = request.messages.len(),
            "completion prepared"
        );

        Ok(Prepared {
            request_id,
            user_id: user_id.to_string(),
            prompt: prompt.to_string(),
            request,
        })
    }

    /// `Prepared -> Streaming`: open the upstream. Errors here occurred
    /// before any byte and map to plain HTTP statuses.
    pub async fn open_stream(
        &self,
        prepared: &Prepared,
    ) -> Result<(DeltaStream, CancellationToken), SolaceError> {
        let cancel = CancellationToken::new();
        let stream = self
            .upstream
            .stream_completion(prepared.request.clone(), cancel.clone())
            .await?;
        Ok((stream, cancel))
    }

    /// Drives `Streaming -> Draining -> Committing -> Done`.
    ///
    /// When `tx` is present, visible deltas and the terminal `[DONE]` are
    /// relayed; when absent (non-streaming request) only the buffer is
    /// accumulated. Always commits before returning.
    pub async fn run(
        &self,
        prepared: Prepared,
        mut stream: DeltaStream,
        cancel: CancellationToken,
        tx: Option<mpsc::Sender<RelayFrame>>,
    ) -> CompletionResult {
        let started = Instant::now();
        metrics::inflight_delta(1.0);

        let deadline = started + self.settings.stream_timeout;
        let mut buffer = String::new();
        let mut forwarded = 0usize;
        let mut suppress_from: Option<usize> = None;
        let mut token_count: u32 = 0;
        let mut saw_first_byte = false;
        let mut outcome: &'static str = "done";
        let mut midstream_error: Option<String> = None;
        let mut tx = tx;

        'streaming: loop {
            let until_deadline = deadline.saturating_duration_since(Instant::now());
            if until_deadline.is_zero() {
                // Hard stream timer: drain with whatever was buffered.
                warn!(request_id = %prepared.request_id, "hard stream timer fired");
                break 'streaming;
            }
            let wait = self.settings.first_byte_timeout.min(until_deadline);

            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    outcome = "client_gone";
                    break 'streaming;
                }
                next = tokio::time::timeout(wait, stream.next()) => next,
            };

            match next {
                // No-byte timer (or the tail of the hard timer) fired.
                Err(_elapsed) => {
                    warn!(request_id = %prepared.request_id, "no-byte timer fired");
                    break 'streaming;
                }
                // Natural end of stream.
                Ok(None) => break 'streaming,
                Ok(Some(Err(e))) => {
                    outcome = "upstream_failed";
                    midstream_error = Some(e.to_string());
                    break 'streaming;
                }
                Ok(Some(Ok(delta))) => {
                    if delta.content.is_empty() {
                        continue;
                    }
                    if !saw_first_byte {
                        saw_first_byte = true;
                        metrics::record_first_byte(started.elapsed().as_secs_f64());
                    }
                    token_count += 1;
                    buffer.push_str(&delta.content);

                    // Stop sequence: drop everything from the match on.
                    if let Some(stop_pos) = find_stop(&buffer) {
                        buffer.truncate(stop_pos);
                        break 'streaming;
                    }

                    if suppress_from.is_none() {
                        suppress_from = find_marker(&buffer);
                    }
                    let safe_end = safe_emit_end(&buffer, suppress_from);
                    if safe_end > forwarded {
                        let chunk = buffer[forwarded..safe_end].to_string();
                        forwarded = safe_end;
                        if let Some(ref sender) = tx {
                            if sender.send(RelayFrame::Content(chunk)).await.is_err() {
                                outcome = "client_gone";
                                break 'streaming;
                            }
                        }
                    }

                    if token_count > self.settings.token_cap {
                        debug!(request_id = %prepared.request_id, token_count, "delta cap reached");
                        break 'streaming;
                    }
                }
            }
        }

        // Draining: stop the upstream, stop timers, flush, terminate.
        cancel.cancel();
        drop(stream);

        // A marker prefix held back at end of stream can no longer
        // complete, but a full marker region stays suppressed.
        if suppress_from.is_none() {
            suppress_from = find_marker(&buffer);
        }
        let final_end = suppress_from.unwrap_or(buffer.len()).min(buffer.len());
        if final_end > forwarded {
            if let Some(ref sender) = tx {
                let _ = sender
                    .send(RelayFrame::Content(buffer[forwarded..final_end].to_string()))
                    .await;
            }
        }
        if let Some(message) = midstream_error {
            if let Some(ref sender) = tx {
                let _ = sender.send(RelayFrame::Error(message)).await;
            }
        }
        if let Some(sender) = tx.take() {
            let _ = sender.send(RelayFrame::Done).await;
        }

        // Committing: the client already has its [DONE]; these writes are
        // best-effort but must finish before the request ends.
        let extraction = extract_metadata(&buffer);
        let content = sanitize(&extraction.cleaned);
        let commit_ok = commit_side_effects(
            self.store.as_ref(),
            &self.user_cache,
            CommitInput {
                user_id: prepared.user_id.clone(),
                user_prompt: prepared.prompt.clone(),
                assistant_content: content.clone(),
                emotion: extraction.emotion,
                task: extraction.task,
            },
        )
        .await;

        metrics::inflight_delta(-1.0);
        metrics::record_latency(started.elapsed().as_secs_f64());
        metrics::record_completion(outcome);

        info!(
            request_id = %prepared.request_id,
            user_id = %prepared.user_id,
            outcome,
            tokens = token_count,
            commit_ok,
            state = %CompletionState::Done,
            "completion finished"
        );

        CompletionResult { content, outcome }
    }
}

/// Earliest stop-sequence match in the buffer.
fn find_stop(buffer: &str) -> Option<usize> {
    STOP_SEQUENCES
        .iter()
        .filter_map(|stop| buffer.find(stop))
        .min()
}

/// Earliest complete marker literal in the buffer.
fn find_marker(buffer: &str) -> Option<usize> {
    match (buffer.find(EMOTION_MARKER), buffer.find(TASK_MARKER)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// How far the buffer can be forwarded without risking marker leakage.
///
/// Everything from a complete marker literal onward is suppressed; below
/// that, the longest buffer suffix that is a proper prefix of either
/// marker literal is held back until the next chunk resolves it.
fn safe_emit_end(buffer: &str, suppress_from: Option<usize>) -> usize {
    if let Some(pos) = suppress_from {
        return pos.min(buffer.len());
    }
    let holdback = marker_prefix_holdback(buffer);
    buffer.len() - holdback
}

/// Length of the longest buffer suffix that could still grow into a
/// marker literal.
fn marker_prefix_holdback(buffer: &str) -> usize {
    let mut holdback = 0;
    for marker in [EMOTION_MARKER, TASK_MARKER] {
        let max = marker.len().saturating_sub(1).min(buffer.len());
        for prefix_len in (1..=max).rev() {
            if buffer.ends_with(&marker[..prefix_len]) {
                holdback = holdback.max(prefix_len);
                break;
            }
        }
    }
    holdback
}
