// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model profiles and compression budget computation.

/// Token characteristics of one upstream model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    pub max_context_tokens: u32,
    pub optimal_intelligence_tokens: u32,
    pub compression_tolerance: f64,
}

const DEFAULT_PROFILE: ModelProfile = ModelProfile {
    max_context_tokens: 8192,
    optimal_intelligence_tokens: 120,
    compression_tolerance: 0.8,
};

/// Looks up the profile for a model id. Unknown models fall back to the
/// default profile.
pub fn profile_for(model: &str) -> ModelProfile {
    match model {
        "solace-chat-1" => DEFAULT_PROFILE,
        "solace-chat-mini" => ModelProfile {
            max_context_tokens: 4096,
            optimal_intelligence_tokens: 80,
            compression_tolerance: 0.9,
        },
        "solace-chat-pro" => ModelProfile {
            max_context_tokens: 32768,
            optimal_intelligence_tokens: 220,
            compression_tolerance: 0.7,
        },
        _ => DEFAULT_PROFILE,
    }
}

/// Budget multiplier for the message type. Unknown types count as
/// `standard`.
pub fn message_type_factor(message_type: &str) -> f64 {
    match message_type {
        "greeting" => 0.3,
        "standard" => 1.0,
        "question" => 1.2,
        "technical" => 1.5,
        "analysis" => 1.8,
        "emotional" => 1.3,
        "creative" => 1.4,
        _ => 1.0,
    }
}

/// Complexity factor: `clamp(0.5 + complexity/10, 0, 2)`.
pub fn complexity_factor(complexity: f64) -> f64 {
    (0.5 + complexity / 10.0).clamp(0.0, 2.0)
}

/// History factor: long conversations earn more context, trivial ones less.
pub fn history_factor(history_len: usize) -> f64 {
    if history_len > 10 {
        1.3
    } else if history_len < 3 {
        0.8
    } else {
        1.0
    }
}

/// Computes the token budget for one compression:
/// `clamp(optimal x complexity x messageType x history, 0, 10% of context)`.
pub fn compute_budget(
    model: &str,
    message_type: &str,
    complexity: f64,
    history_len: usize,
) -> u32 {
    let profile = profile_for(model);
    let raw = f64::from(profile.optimal_intelligence_tokens)
        * complexity_factor(complexity)
        * message_type_factor(message_type)
        * history_factor(history_len);
    let ceiling = f64::from(profile.max_context_tokens) * 0.10;
    raw.clamp(0.0, ceiling) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_uses_default_profile() {
        assert_eq!(profile_for("who-knows"), DEFAULT_PROFILE);
        assert_eq!(profile_for("solace-chat-1"), DEFAULT_PROFILE);
    }

    #[test]
    fn message_type_factors_match_contract() {
        assert_eq!(message_type_factor("greeting"), 0.3);
        assert_eq!(message_type_factor("analysis"), 1.8);
        assert_eq!(message_type_factor("emotional"), 1.3);
        assert_eq!(message_type_factor("unheard-of"), 1.0);
    }

    #[test]
    fn complexity_factor_is_clamped() {
        assert_eq!(complexity_factor(0.0), 0.5);
        assert_eq!(complexity_factor(5.0), 1.0);
        assert_eq!(complexity_factor(100.0), 2.0);
        assert_eq!(complexity_factor(-100.0), 0.0);
    }

    #[test]
    fn history_factor_thresholds() {
        assert_eq!(history_factor(0), 0.8);
        assert_eq!(history_factor(2), 0.8);
        assert_eq!(history_factor(3), 1.0);
        assert_eq!(history_factor(10), 1.0);
        assert_eq!(history_factor(11), 1.3);
    }

    #[test]
    fn budget_never_exceeds_ten_percent_of_context() {
        // analysis x high complexity x long history maximizes the raw value.
        let budget = compute_budget("solace-chat-mini", "analysis", 10.0, 50);
        assert!(budget <= 409, "10% of 4096 is 409.6, got {budget}");
    }

    #[test]
    fn greeting_budget_is_small() {
        let budget = compute_budget("solace-chat-1", "greeting", 2.0, 1);
        // 120 * 0.7 * 0.3 * 0.8 = 20.16
        assert_eq!(budget, 20);
    }
}
