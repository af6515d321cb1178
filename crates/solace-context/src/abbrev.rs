// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Abbreviation dictionary, version 1.
//!
//! The dictionary is part of the wire contract for the compressed
//! intelligence summary: downstream prompts are written against these
//! codes, so changes require a new version tag, never an in-place edit.

/// Version tag carried in compression metadata.
pub const DICTIONARY_VERSION: &str = "v1";

/// Fixed long-key / long-value to short-code mapping.
///
/// Sorted by the long form; looked up linearly (the table is small and
/// the scan is branch-predictable).
const DICTIONARY: &[(&str, &str)] = &[
    ("analytical", "anl"),
    ("attentionSpan", "att"),
    ("behaviorPattern", "bp"),
    ("cognitiveLoad", "cl"),
    ("cognitiveStyle", "cs"),
    ("communicationStyle", "com"),
    ("currentFocus", "cf"),
    ("currentState", "st"),
    ("decisionMaking", "dm"),
    ("decreasing", "dec"),
    ("emotionalIntensity", "ei"),
    ("emotionalState", "es"),
    ("emotionalTrend", "et"),
    ("engagementLevel", "eng"),
    ("engagementTrend", "egt"),
    ("high", "hi"),
    ("increasing", "inc"),
    ("interactionPattern", "ip"),
    ("interactionStyle", "is"),
    ("learningStyle", "ls"),
    ("low", "lo"),
    ("medium", "med"),
    ("messageComplexity", "mc"),
    ("messageType", "mt"),
    ("moodStability", "ms"),
    ("negative", "neg"),
    ("neutral", "neu"),
    ("personalityType", "pt"),
    ("positive", "pos"),
    ("preferredDepth", "pd"),
    ("primaryEmotion", "e"),
    ("responseLength", "rl"),
    ("sessionMood", "sm"),
    ("stable", "stb"),
    ("topicFocus", "tf"),
    ("trustLevel", "tl"),
    ("verbosity", "vb"),
    ("volatile", "vol"),
];

/// Looks up the short code for a long form. Returns `None` for unknown
/// inputs so callers can apply their generic fallback.
pub fn abbreviate(long: &str) -> Option<&'static str> {
    DICTIONARY
        .iter()
        .find(|(k, _)| *k == long)
        .map(|(_, v)| *v)
}
