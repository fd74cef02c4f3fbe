//! Output Normalizer / Merger
//!
//! Boundary between untyped, externally generated payloads (model output,
//! stage output) and the canonical [`Advisory`] shape. Everything here is
//! total: the payload shape is not contractually guaranteed, so every
//! function degrades to an empty or partial advisory instead of failing.

use std::collections::HashSet;

use regex::Regex;
use serde_json::{json, Value};

use crate::models::{Advisory, HorizonActions};

/// Strip a leading bullet or enumeration marker (`-`, `•`, `*`, `1.`, `1)`)
/// from a line.
pub fn strip_bullet(line: &str) -> String {
    let re = Regex::new(r"^\s*(?:[-•*]+|\d+[.)])\s*").expect("valid regex");
    re.replace(line, "").trim().to_string()
}

/// Total conversion of any JSON shape to a list of strings.
///
/// Arrays pass through (non-strings JSON-encoded); strings split on
/// newlines with bullet markers stripped and blank lines dropped; objects
/// flatten one level through their values; null maps to empty; any other
/// scalar becomes its single string form. Idempotent over its own output.
pub fn to_array(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(stringify).collect(),
        Value::String(s) => s
            .lines()
            .map(strip_bullet)
            .filter(|line| !line.is_empty())
            .collect(),
        Value::Object(map) => {
            let mut out = Vec::new();
            for v in map.values() {
                match v {
                    Value::Array(items) => out.extend(items.iter().map(stringify)),
                    other => out.push(stringify(other)),
                }
            }
            out
        }
        scalar => vec![stringify(scalar)],
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Best-effort extraction of a JSON value from free text.
///
/// Tries the whole string, then the outermost `{..}` block; as a last
/// resort wraps the raw text as `{"summary": text}` so downstream
/// normalization still produces something displayable.
pub fn extract_json(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return json!({});
    }
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return v;
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return v;
            }
        }
    }
    json!({ "summary": trimmed })
}

/// Normalize an arbitrarily shaped advisory payload to the canonical shape.
///
/// Tolerates the key aliases the model backends have been observed to use
/// (`synopsis`, `health`, `actions`, `shortTerm`/`short`, `watchouts`).
pub fn normalize(raw: &Value) -> Advisory {
    let summary = field_string(raw, &["summary", "synopsis"]).unwrap_or_default();
    let tone = field_string(raw, &["tone", "health"]);
    let risk = coerce_risk(raw.get("risk"));

    let horizon_actions = HorizonActions {
        short: bucket(raw, "short", "shortTerm"),
        medium: bucket(raw, "medium", "midTerm"),
        long: bucket(raw, "long", "longTerm"),
    };

    let risks = ["risks", "watchouts"]
        .iter()
        .find_map(|k| raw.get(*k))
        .map(to_array)
        .unwrap_or_default();

    let narrative = field_string(raw, &["narrative"]).unwrap_or_default();

    Advisory {
        summary,
        tone,
        risk,
        horizon_actions,
        risks,
        narrative,
    }
}

/// Parse free text as a canonical advisory: JSON extraction + normalization
pub fn normalize_text(text: &str) -> Advisory {
    normalize(&extract_json(text))
}

fn bucket(raw: &Value, key: &str, alias: &str) -> Vec<String> {
    let candidates = [
        raw.get("horizonActions").and_then(|h| h.get(key)),
        raw.get("actions").and_then(|a| a.get(key)),
        raw.get(alias),
        raw.get(key),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .map(to_array)
        .unwrap_or_default()
}

fn field_string(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match raw.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Coerce a risk value to a number in 0..=100, or drop it.
///
/// Numbers and numeric strings pass through clamped; the label scale
/// `basso|medio|alto` (and English equivalents) maps to 25/50/75.
fn coerce_risk(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.replace(',', ".").parse::<f64>() {
                Some(v)
            } else {
                match s.to_lowercase().as_str() {
                    "basso" | "low" => Some(25.0),
                    "medio" | "medium" => Some(50.0),
                    "alto" | "high" => Some(75.0),
                    _ => None,
                }
            }
        }
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 100.0))
}

/// Merge the rule-based baseline with the agent advisory.
///
/// Scalar fields prefer the agent output and fall back to the baseline;
/// list fields concatenate baseline-first and drop duplicate trimmed
/// entries, preserving first-seen order.
pub fn merge(base: &Advisory, ai: &Advisory) -> Advisory {
    Advisory {
        summary: prefer(&ai.summary, &base.summary),
        tone: ai.tone.clone().or_else(|| base.tone.clone()),
        risk: ai.risk.or(base.risk),
        horizon_actions: HorizonActions {
            short: dedup_concat(&base.horizon_actions.short, &ai.horizon_actions.short),
            medium: dedup_concat(&base.horizon_actions.medium, &ai.horizon_actions.medium),
            long: dedup_concat(&base.horizon_actions.long, &ai.horizon_actions.long),
        },
        risks: dedup_concat(&base.risks, &ai.risks),
        narrative: prefer(&ai.narrative, &base.narrative),
    }
}

fn prefer(preferred: &str, fallback: &str) -> String {
    if preferred.trim().is_empty() {
        fallback.to_string()
    } else {
        preferred.to_string()
    }
}

fn dedup_concat(base: &[String], ai: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in base.iter().chain(ai.iter()) {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}
