// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-band metadata extraction.
//!
//! The model emits side-effects as marker lines inside its reply:
//!
//! ```text
//! EMOTION_LOG: {"emotion":"sad","intensity":6,"context":"..."}
//! TASK_INFERENCE: {"taskType":"plan_day","parameters":{}}
//! ```
//!
//! The extractor runs once on the full accumulated buffer at end of
//! stream, strips every marker region from the visible text, and returns
//! at most one emotion and one task (first well-formed occurrence wins).
//! It is idempotent: running it on its own output is a no-op.

use serde_json::Value;
use tracing::debug;

use solace_core::types::{InferredEmotion, InferredTask};

/// Marker literal announcing an emotion payload.
pub const EMOTION_MARKER: &str = "EMOTION_LOG";
/// Marker literal announcing a task payload.
pub const TASK_MARKER: &str = "TASK_INFERENCE";

/// Outcome of parsing one marker region. Parse failures never abort the
/// relay; they strip the region and carry a reason for the debug log.
enum MarkerParse<T> {
    Parsed(T),
    Skipped(&'static str),
}

/// Result of one extraction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub emotion: Option<InferredEmotion>,
    pub task: Option<InferredTask>,
    pub cleaned: String,
}

/// Extracts and strips all marker regions from `buffer`.
pub fn extract_metadata(buffer: &str) -> Extraction {
    let mut emotion: Option<InferredEmotion> = None;
    let mut task: Option<InferredTask> = None;
    let mut cleaned = String::with_capacity(buffer.len());
    let mut cursor = 0;

    while let Some((start, marker)) = next_marker(buffer, cursor) {
        cleaned.push_str(&buffer[cursor..start]);

        let payload_start = skip_marker_head(buffer, start + marker.len());
        let region_end = match balanced_json_region(buffer, payload_start) {
            Some(end) => {
                let json_text = &buffer[payload_start..end];
                match marker {
                    EMOTION_MARKER if emotion.is_none() => {
                        match parse_emotion(json_text) {
                            MarkerParse::Parsed(e) => emotion = Some(e),
                            MarkerParse::Skipped(reason) => {
                                debug!(reason, "emotion marker skipped");
                            }
                        }
                    }
                    TASK_MARKER if task.is_none() => match parse_task(json_text) {
                        MarkerParse::Parsed(t) => task = Some(t),
                        MarkerParse::Skipped(reason) => {
                            debug!(reason, "task marker skipped");
                        }
                    },
                    // A later occurrence of an already-filled marker is
                    // stripped but discarded.
                    _ => {}
                }
                end
            }
            // An unclosed object was cut off mid-stream: strip to the end.
            // No object at all: strip just the marker head.
            None if buffer.as_bytes().get(payload_start) == Some(&b'{') => buffer.len(),
            None => payload_start,
        };
        cursor = region_end;
    }
    cleaned.push_str(&buffer[cursor..]);

    Extraction {
        emotion,
        task,
        cleaned: tidy(&cleaned),
    }
}

/// Finds the next marker occurrence at or after `from`.
fn next_marker(buffer: &str, from: usize) -> Option<(usize, &'static str)> {
    let tail = &buffer[from..];
    let emotion = tail.find(EMOTION_MARKER).map(|i| (from + i, EMOTION_MARKER));
    let task = tail.find(TASK_MARKER).map(|i| (from + i, TASK_MARKER));
    match (emotion, task) {
        (Some(e), Some(t)) => Some(if e.0 <= t.0 { e } else { t }),
        (Some(e), None) => Some(e),
        (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}

/// Skips the optional colon and whitespace between a marker literal and
/// its JSON object.
fn skip_marker_head(buffer: &str, mut pos: usize) -> usize {
    let bytes = buffer.as_bytes();
    while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b':' {
        pos += 1;
    }
    while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
        pos += 1;
    }
    pos
}

/// Returns the end (exclusive) of the first balanced-brace region
/// starting at `start`, honoring JSON string quoting and escapes.
/// `None` when `start` is not an opening brace or the region never closes.
fn balanced_json_region(buffer: &str, start: usize) -> Option<usize> {
    let bytes = buffer.as_bytes();
    if start >= bytes.len() || bytes[start] != b'{' {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_emotion(json_text: &str) -> MarkerParse<InferredEmotion> {
    let value: Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(_) => return MarkerParse::Skipped("emotion payload is not valid JSON"),
    };
    let Some(obj) = value.as_object() else {
        return MarkerParse::Skipped("emotion payload is not an object");
    };
    let emotion = match obj.get("emotion").and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return MarkerParse::Skipped("emotion field missing or empty"),
    };
    // Non-numeric intensity is dropped; numeric is clamped to [1,10].
    let intensity = obj.get("intensity").and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().map(|f| f.round() as i64))
            .map(|i| i.clamp(1, 10))
    });
    let context = obj
        .get("context")
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    MarkerParse::Parsed(InferredEmotion {
        emotion,
        intensity,
        context,
    })
}

fn parse_task(json_text: &str) -> MarkerParse<InferredTask> {
    let value: Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(_) => return MarkerParse::Skipped("task payload is not valid JSON"),
    };
    let Some(obj) = value.as_object() else {
        return MarkerParse::Skipped("task payload is not an object");
    };
    let task_type = match obj.get("taskType").and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return MarkerParse::Skipped("taskType missing or empty"),
    };
    // `parameters` defaults to an empty mapping when absent or non-object.
    let parameters = obj
        .get("parameters")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    MarkerParse::Parsed(InferredTask {
        task_type,
        parameters,
    })
}

/// Collapses runs of two or more blank lines to a single newline and
/// trims the result. A single blank line (two newlines) is kept.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newline_run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newline_run += 1;
            continue;
        }
        flush_newlines(&mut out, newline_run);
        newline_run = 0;
        out.push(ch);
    }
    flush_newlines(&mut out, newline_run);
    out.trim().to_string()
}

fn flush_newlines(out: &mut String, run: usize) {
    match run {
        0 => {}
        1 => out.push('\n'),
        2 => out.push_str("\n\n"),
        _ => out.push('\n'),
    }
}
