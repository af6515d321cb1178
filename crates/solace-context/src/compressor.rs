// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intelligence compressor: folds the four-layer behavioral context into
//! a compact tagged string within a computed token budget.
//!
//! The pipeline: budget -> semantic clustering -> strategy selection ->
//! priority-weighted allocation -> per-cluster `k:v` compression ->
//! tagged assembly with trailing-pair truncation. Output is deterministic
//! for identical inputs and dictionary version.

use serde_json::Value;
use tracing::warn;

use solace_core::types::IntelligenceContext;

use crate::abbrev::{abbreviate, DICTIONARY_VERSION};
use crate::profiles;

/// Compression strategy, selected by budget unless forced by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Minimal,
    Balanced,
    Comprehensive,
}

/// Caller-supplied knobs for one compression.
#[derive(Debug, Clone)]
pub struct CompressionParams {
    pub message_type: String,
    pub complexity: f64,
    pub history_len: usize,
    pub model: String,
    pub forced_strategy: Option<Strategy>,
}

/// A finished compression with its quality metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedIntelligence {
    pub text: String,
    pub estimated_tokens: u32,
    pub budget: u32,
    pub strategy: Strategy,
    /// True when an internal error forced the one-line fallback.
    pub fallback: bool,
    pub dictionary_version: &'static str,
}

/// The seven semantic clusters, in assembly priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cluster {
    Emotional,
    Dynamic,
    Contextual,
    Core,
    Behavioral,
    Cognitive,
    Predictive,
}

const ALL_CLUSTERS: [Cluster; 7] = [
    Cluster::Emotional,
    Cluster::Dynamic,
    Cluster::Contextual,
    Cluster::Core,
    Cluster::Behavioral,
    Cluster::Cognitive,
    Cluster::Predictive,
];

impl Cluster {
    /// Fixed source reliability in [0,1].
    fn reliability(self) -> f64 {
        match self {
            Cluster::Core => 0.9,
            Cluster::Dynamic => 0.7,
            Cluster::Contextual => 0.6,
            Cluster::Predictive => 0.5,
            Cluster::Behavioral => 0.8,
            Cluster::Emotional => 0.75,
            Cluster::Cognitive => 0.85,
        }
    }
}

/// Keys routed to the emotional cluster out of the micro layer.
const EMOTIONAL_KEYS: &[&str] = &[
    "primaryEmotion",
    "emotionalIntensity",
    "emotionalTrend",
    "emotionalState",
    "sessionMood",
    "moodStability",
];

/// Keys routed to the behavioral cluster out of the medium layer.
const BEHAVIORAL_KEYS: &[&str] = &[
    "behaviorPattern",
    "interactionPattern",
    "interactionStyle",
    "engagementTrend",
    "engagementLevel",
    "responseLength",
    "verbosity",
];

/// Keys routed to the cognitive cluster out of the macro layer.
const COGNITIVE_KEYS: &[&str] = &[
    "cognitiveStyle",
    "cognitiveLoad",
    "learningStyle",
    "decisionMaking",
    "attentionSpan",
    "preferredDepth",
];

/// Compresses an intelligence context into a tagged summary.
///
/// Never fails: any internal error degrades to the one-line fallback
/// `"User shows <type> communication pattern."` with `fallback` set.
pub fn compress(ctx: &IntelligenceContext, params: &CompressionParams) -> CompressedIntelligence {
    match try_compress(ctx, params) {
        Ok(result) => result,
        Err(reason) => {
            warn!(reason, "intelligence compression failed, using fallback");
            fallback(params)
        }
    }
}

/// Builds the fallback summary for a failed compression.
fn fallback(params: &CompressionParams) -> CompressedIntelligence {
    let text = format!("User shows {} communication pattern.", params.message_type);
    let estimated_tokens = estimate_tokens(&text);
    CompressedIntelligence {
        text,
        estimated_tokens,
        budget: 0,
        strategy: Strategy::Minimal,
        fallback: true,
        dictionary_version: DICTIONARY_VERSION,
    }
}

fn try_compress(
    ctx: &IntelligenceContext,
    params: &CompressionParams,
) -> Result<CompressedIntelligence, &'static str> {
    if !params.complexity.is_finite() {
        return Err("non-finite complexity");
    }

    // 1. Budget.
    let budget = profiles::compute_budget(
        &params.model,
        &params.message_type,
        params.complexity,
        params.history_len,
    );

    // 2. Clustering.
    let clusters = cluster(ctx);

    // 3. Strategy.
    let strategy = params.forced_strategy.unwrap_or(if budget <= 50 {
        Strategy::Minimal
    } else if budget >= 150 {
        Strategy::Comprehensive
    } else {
        Strategy::Balanced
    });

    // 4+5. Priority-weighted allocation.
    let mut adjusted = [0.0f64; 7];
    let mut total = 0.0f64;
    for (i, c) in ALL_CLUSTERS.iter().enumerate() {
        let count = clusters[i].len();
        if count == 0 {
            continue;
        }
        let richness = (count as f64 / 10.0).min(1.0);
        adjusted[i] = base_priority(strategy, *c) * c.reliability() * richness;
        total += adjusted[i];
    }

    // 6. Per-cluster compression.
    let mut sections: Vec<(&'static str, Vec<String>)> = Vec::new();
    let mut micro_pairs: Vec<String> = Vec::new();
    for (i, c) in ALL_CLUSTERS.iter().enumerate() {
        if clusters[i].is_empty() {
            continue;
        }
        let allocated = if total > 0.0 {
            (f64::from(budget) * adjusted[i] / total).floor() as u32
        } else {
            0
        };
        let pairs = compress_cluster(&clusters[i], allocated);
        if pairs.is_empty() {
            continue;
        }
        match c {
            // Emotional and dynamic share the MICRO section, emotional first.
            Cluster::Emotional | Cluster::Dynamic => micro_pairs.extend(pairs),
            Cluster::Contextual => sections.push(("TOPIC", pairs)),
            Cluster::Core => sections.push(("CORE", pairs)),
            Cluster::Behavioral => sections.push(("BEHAV", pairs)),
            Cluster::Cognitive => sections.push(("COG", pairs)),
            Cluster::Predictive => sections.push(("PRED", pairs)),
        }
    }
    if !micro_pairs.is_empty() {
        sections.insert(0, ("MICRO", micro_pairs));
    }

    // 7. Assembly with trailing-pair truncation.
    let mut text = render(&sections);
    while estimate_tokens(&text) > budget {
        if !pop_trailing_pair(&mut sections) {
            text = String::new();
            break;
        }
        text = render(&sections);
    }

    let estimated_tokens = estimate_tokens(&text);
    Ok(CompressedIntelligence {
        text,
        estimated_tokens,
        budget,
        strategy,
        fallback: false,
        dictionary_version: DICTIONARY_VERSION,
    })
}

/// Partitions the four layers into the seven clusters. Order inside one
/// cluster follows serde_json's sorted object iteration, so the result
/// is stable for identical inputs.
fn cluster(ctx: &IntelligenceContext) -> [Vec<(String, Value)>; 7] {
    let mut out: [Vec<(String, Value)>; 7] = Default::default();

    let idx = |c: Cluster| ALL_CLUSTERS.iter().position(|x| *x == c).unwrap_or(0);

    if let Value::Object(map) = &ctx.micro {
        for (k, v) in map {
            let target = if EMOTIONAL_KEYS.contains(&k.as_str()) {
                Cluster::Emotional
            } else {
                Cluster::Dynamic
            };
            out[idx(target)].push((k.clone(), v.clone()));
        }
    }
    if let Value::Object(map) = &ctx.medium {
        for (k, v) in map {
            let target = if BEHAVIORAL_KEYS.contains(&k.as_str()) {
                Cluster::Behavioral
            } else {
                Cluster::Contextual
            };
            out[idx(target)].push((k.clone(), v.clone()));
        }
    }
    if let Value::Object(map) = &ctx.macro_ {
        for (k, v) in map {
            let target = if COGNITIVE_KEYS.contains(&k.as_str()) {
                Cluster::Cognitive
            } else {
                Cluster::Core
            };
            out[idx(target)].push((k.clone(), v.clone()));
        }
    }
    if let Value::Object(map) = &ctx.synthesis {
        for (k, v) in map {
            out[idx(Cluster::Predictive)].push((k.clone(), v.clone()));
        }
    }

    out
}

/// Base priority matrix. Emotional and dynamic always rank at or above
/// core for every strategy.
fn base_priority(strategy: Strategy, cluster: Cluster) -> f64 {
    use Cluster::*;
    match strategy {
        Strategy::Minimal => match cluster {
            Emotional => 1.0,
            Dynamic => 0.9,
            Core => 0.5,
            Behavioral => 0.4,
            Contextual => 0.3,
            Cognitive => 0.3,
            Predictive => 0.2,
        },
        Strategy::Balanced => match cluster {
            Emotional => 1.0,
            Dynamic => 0.9,
            Core => 0.7,
            Behavioral => 0.7,
            Contextual => 0.6,
            Cognitive => 0.6,
            Predictive => 0.5,
        },
        Strategy::Comprehensive => match cluster {
            Emotional => 1.0,
            Dynamic => 0.9,
            Core => 0.8,
            Behavioral => 0.8,
            Contextual => 0.8,
            Cognitive => 0.8,
            Predictive => 0.7,
        },
    }
}

/// Compresses one cluster's entries into `k:v` pair strings. The
/// allocation picks the level: ultra keeps 3 pairs, standard 6,
/// detailed all.
fn compress_cluster(entries: &[(String, Value)], allocated: u32) -> Vec<String> {
    let keep = if allocated < 20 {
        3
    } else if allocated <= 50 {
        6
    } else {
        usize::MAX
    };

    entries
        .iter()
        .take(keep)
        .filter_map(|(k, v)| {
            let value = compress_value(v);
            if value.is_empty() {
                None
            } else {
                Some(format!("{}:{}", compress_key(k), value))
            }
        })
        .collect()
}

/// Abbreviates a key through the dictionary, falling back to the first
/// five characters.
fn compress_key(key: &str) -> String {
    if let Some(code) = abbreviate(key) {
        return code.to_string();
    }
    key.chars().take(5).collect()
}

/// Recursively compresses one value.
fn compress_value(value: &Value) -> String {
    match value {
        Value::String(s) => compress_str(s),
        Value::Number(n) => compress_number(n),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Array(items) => items.iter().map(compress_value).collect(),
        Value::Object(map) => {
            // `{trend, current}` and `{emotion, intensity}` get short forms.
            if let (Some(trend), Some(current)) = (map.get("trend"), map.get("current")) {
                return format!("{}~{}", compress_value(current), compress_value(trend));
            }
            if let (Some(emotion), Some(intensity)) = (map.get("emotion"), map.get("intensity")) {
                return format!("{}{}", compress_value(emotion), compress_value(intensity));
            }
            map.values().next().map(compress_value).unwrap_or_default()
        }
        Value::Null => String::new(),
    }
}

fn compress_str(s: &str) -> String {
    if let Some(code) = abbreviate(s) {
        return code.to_string();
    }
    s.chars().take(8).collect()
}

fn compress_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
        Some(f) => format!("{f:.1}"),
        None => String::new(),
    }
}

/// Renders the sections as `TAG{p,p,...}` joined by single spaces.
fn render(sections: &[(&'static str, Vec<String>)]) -> String {
    sections
        .iter()
        .filter(|(_, pairs)| !pairs.is_empty())
        .map(|(tag, pairs)| format!("{tag}{{{}}}", pairs.join(",")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops the last `k:v` pair of the last non-empty section. Returns
/// false once nothing is left to drop.
fn pop_trailing_pair(sections: &mut [(&'static str, Vec<String>)]) -> bool {
    for (_, pairs) in sections.iter_mut().rev() {
        if pairs.pop().is_some() {
            return true;
        }
    }
    false
}

/// Coarse but monotonic and deterministic token estimate: `ceil(len/4)`.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.len() as u32).div_ceil(4)
}
