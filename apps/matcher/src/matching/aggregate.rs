//! Score Aggregator: pure combination of weighted requirements and per-requirement scores.
//!
//! Algorithm:
//! 1. Index scores by `req_index`, discarding indices outside the requirement list.
//! 2. base = Σ(weight × status); total weight floored at 1.0.
//! 3. matched: status ≥ 0.95; missing: status < 0.5 (0.5 itself is neither).
//! 4. Up to 3 highlights in requirement order, each cut at 350 chars + "…".
//! 5. Bonus +2 per must-have whose inferred years meet `min_years`, capped at 10.
//! 6. overall = round(min(100, 100 × base / total + bonus), 1).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::matching::requirements::Requirement;
use crate::matching::scorer::ScoredRequirement;

pub const MATCHED_THRESHOLD: f64 = 0.95;
pub const MISSING_THRESHOLD: f64 = 0.5;
pub const MAX_HIGHLIGHTS: usize = 3;
pub const HIGHLIGHT_MAX_CHARS: usize = 350;
pub const TRUNCATION_MARKER: &str = "…";
pub const YEARS_BONUS: f64 = 2.0;
pub const YEARS_BONUS_CAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub must_have: f64,
    pub optional: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub llm_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchMeta {
    pub prompt_version: String,
    pub rules_version: String,
    pub input_mode: String,
}

/// Final result returned to callers and cached under the `final_score` kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score_overall: f64,
    pub subscores: Subscores,
    pub skills: Skills,
    pub highlights: Vec<String>,
    pub explanations: String,
    pub model_info: ModelInfo,
    pub meta: MatchMeta,
}

/// Output of [`aggregate`] before version metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub score_overall: f64,
    pub subscores: Subscores,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub highlights: Vec<String>,
}

pub fn aggregate(requirements: &[Requirement], scored: &[ScoredRequirement]) -> Aggregate {
    let by_index: HashMap<usize, &ScoredRequirement> = scored
        .iter()
        .filter_map(|s| {
            usize::try_from(s.req_index)
                .ok()
                .filter(|i| *i < requirements.len())
                .map(|i| (i, s))
        })
        .collect();

    let total_weight = floor_weight(requirements.iter().map(|r| r.weight).sum());
    let must_weight = floor_weight(requirements.iter().filter(|r| r.must).map(|r| r.weight).sum());
    let opt_weight = floor_weight(requirements.iter().filter(|r| !r.must).map(|r| r.weight).sum());

    let mut base = 0.0_f64;
    let mut must_sum = 0.0_f64;
    let mut opt_sum = 0.0_f64;
    let mut bonus = 0.0_f64;
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut highlights = Vec::new();

    for (i, req) in requirements.iter().enumerate() {
        let score = by_index.get(&i);
        let status = score.map(|s| normalize_status(s.status)).unwrap_or(0.0);

        let earned = req.weight * status;
        base += earned;
        if req.must {
            must_sum += earned;
        } else {
            opt_sum += earned;
        }

        if status >= MATCHED_THRESHOLD {
            matched.push(req.text.clone());
        }
        if status < MISSING_THRESHOLD {
            missing.push(req.text.clone());
        }

        if let Some(score) = score {
            for quote in &score.evidence {
                if highlights.len() >= MAX_HIGHLIGHTS {
                    break;
                }
                let quote = quote.trim();
                if !quote.is_empty() {
                    highlights.push(truncate_quote(quote));
                }
            }

            if let (true, Some(min_years), Some(years)) = (req.must, req.min_years, score.years) {
                if years >= min_years {
                    bonus += YEARS_BONUS;
                }
            }
        }
    }

    let bonus = bonus.min(YEARS_BONUS_CAP);
    let base_ratio = base / total_weight;

    let has_must = requirements.iter().any(|r| r.must);
    let has_optional = requirements.iter().any(|r| !r.must);

    Aggregate {
        score_overall: round1((100.0 * base_ratio + bonus).min(100.0)),
        subscores: Subscores {
            must_have: if has_must {
                round1(100.0 * must_sum / must_weight)
            } else {
                0.0
            },
            optional: if has_optional {
                round1(100.0 * opt_sum / opt_weight)
            } else {
                0.0
            },
        },
        matched,
        missing,
        highlights,
    }
}

/// Human-readable summary attached to every result.
pub fn build_explanation(input_mode: &str, prompt_version: &str, rules_version: &str) -> String {
    format!(
        "Score is based on the vacancy's requirement checklist (must-have/optional) \
         with quotes from the resume. Input mode: {input_mode}; prompt={prompt_version}; \
         rules={rules_version}."
    )
}

/// Clamps a service-provided status into [0, 1]. Values inside the range but
/// outside {0, 0.5, 1} are kept and logged.
fn normalize_status(status: f64) -> f64 {
    if !status.is_finite() {
        warn!("Non-finite requirement status {status}, treating as 0");
        return 0.0;
    }
    if status != 0.0 && status != 0.5 && status != 1.0 {
        warn!("Requirement status {status} is outside {{0, 0.5, 1}}");
    }
    status.clamp(0.0, 1.0)
}

fn floor_weight(weight: f64) -> f64 {
    if weight > 0.0 {
        weight
    } else {
        1.0
    }
}

fn truncate_quote(quote: &str) -> String {
    match quote.char_indices().nth(HIGHLIGHT_MAX_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &quote[..cut]),
        None => quote.to_string(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
