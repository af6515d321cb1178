// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply sanitizer: removes model chrome the extractor does not cover.
//!
//! Runs on the cleaned text after extraction. Strips instruction
//! delimiters, role prefixes, code fences that still contain a marker,
//! and any residual marker substring (case-insensitive). When nothing
//! visible is left, a fixed apology replaces the reply so the client
//! never receives an empty assistant turn.

use crate::extract::{EMOTION_MARKER, TASK_MARKER};

/// Last-resort content for an empty reply.
pub const APOLOGY: &str =
    "I'm sorry, I lost my train of thought there. Could you say that again?";

/// Instruction-delimiter tokens removed wherever they appear.
const FRAMING_TOKENS: &[&str] = &["[INST]", "[/INST]", "<s>", "</s>"];

/// Role prefixes removed from the start of a line.
const ROLE_PREFIXES: &[&str] = &["USER:", "Human:", "Assistant:", "AI:"];

/// Sanitizes `text`, substituting the apology when the result is empty.
pub fn sanitize(text: &str) -> String {
    let mut out = strip_marker_fences(text);

    for token in FRAMING_TOKENS {
        out = out.replace(token, "");
    }

    out = out
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            for prefix in ROLE_PREFIXES {
                if let Some(rest) = trimmed.strip_prefix(prefix) {
                    return rest.trim_start().to_string();
                }
            }
            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n");

    out = strip_case_insensitive(&out, EMOTION_MARKER);
    out = strip_case_insensitive(&out, TASK_MARKER);

    let out = out.trim().to_string();
    if out.is_empty() {
        APOLOGY.to_string()
    } else {
        out
    }
}

/// Removes triple-backtick blocks whose body contains a marker literal
/// (case-insensitive). Fences without markers are kept verbatim.
fn strip_marker_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some(open) = rest.find("```") else {
            out.push_str(rest);
            return out;
        };
        let after_open = &rest[open + 3..];
        let Some(close) = after_open.find("```") else {
            out.push_str(rest);
            return out;
        };
        let body = &after_open[..close];
        let lowered = body.to_lowercase();
        out.push_str(&rest[..open]);
        if !lowered.contains(&EMOTION_MARKER.to_lowercase())
            && !lowered.contains(&TASK_MARKER.to_lowercase())
        {
            out.push_str(&rest[open..open + 3 + close + 3]);
        }
        rest = &after_open[close + 3..];
    }
}

/// Removes every occurrence of the ASCII `needle` ignoring case.
/// Byte-windowed so non-ASCII text around a marker cannot shift offsets.
fn strip_case_insensitive(haystack: &str, needle: &str) -> String {
    let bytes = haystack.as_bytes();
    let needle = needle.as_bytes();
    let mut out = String::with_capacity(haystack.len());
    let mut i = 0;
    while i < bytes.len() {
        if i + needle.len() <= bytes.len()
            && bytes[i..i + needle.len()].eq_ignore_ascii_case(needle)
        {
            i += needle.len();
            continue;
        }
        let mut j = i + 1;
        while j < bytes.len() && !haystack.is_char_boundary(j) {
            j += 1;
        }
        out.push_str(&haystack[i..j]);
        i = j;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_text_is_untouched() {
        assert_eq!(sanitize("A perfectly fine reply."), "A perfectly fine reply.");
    }

    #[test]
    fn empty_input_becomes_apology() {
        assert_eq!(sanitize(""), APOLOGY);
        assert_eq!(sanitize("   \n\t "), APOLOGY);
    }

    #[test]
    fn instruction_delimiters_are_removed() {
        assert_eq!(sanitize("[INST]hello[/INST] <s>world</s>"), "hello world");
    }

    #[test]
    fn role_prefixes_are_stripped_from_line_starts() {
        assert_eq!(sanitize("Assistant: here you go"), "here you go");
        assert_eq!(sanitize("line one\nHuman: echoed prompt"), "line one\nechoed prompt");
        // Mid-line occurrences are not line prefixes.
        assert_eq!(sanitize("the Assistant: role"), "the Assistant: role");
    }

    #[test]
    fn residual_markers_are_removed_case_insensitively() {
        assert_eq!(sanitize("text emotion_log text"), "text  text");
        assert_eq!(sanitize("Task_Inference leftover"), "leftover");
    }

    #[test]
    fn code_fence_with_marker_is_dropped() {
        let text = "before ```EMOTION_LOG: {\"emotion\":\"x\"}``` after";
        assert_eq!(sanitize(text), "before  after");
    }

    #[test]
    fn code_fence_without_marker_is_kept() {
        let text = "look: ```let x = 1;``` neat";
        assert_eq!(sanitize(text), "look: ```let x = 1;``` neat");
    }

    #[test]
    fn fully_stripped_reply_falls_back_to_apology() {
        assert_eq!(sanitize("[INST][/INST]"), APOLOGY);
        assert_eq!(sanitize("```TASK_INFERENCE```"), APOLOGY);
    }
}
