//! Requirement Parser: turns raw vacancy text into an ordered, weighted checklist.
//!
//! Order is significant: scores reference requirements by index only.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::llm_client::LlmError;
use crate::matching::prompts::REQUIREMENTS_INSTRUCTIONS;
use crate::matching::service::ReasoningService;

pub const MUST_WEIGHT: f64 = 2.0;
pub const OPTIONAL_WEIGHT: f64 = 1.0;

/// One atomic, weighted requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub must: bool,
    pub min_years: Option<f64>,
    pub level: Option<String>,
    pub weight: f64,
}

/// A requirement as the reasoning service returns it, before weighting.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedRequirement {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub must: bool,
    pub min_years: Option<f64>,
    pub level: Option<String>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VacancyRequirements {
    pub requirements: Vec<ParsedRequirement>,
}

impl From<ParsedRequirement> for Requirement {
    fn from(parsed: ParsedRequirement) -> Self {
        let default_weight = if parsed.must {
            MUST_WEIGHT
        } else {
            OPTIONAL_WEIGHT
        };
        // Only a finite positive weight counts as explicit.
        let weight = parsed
            .weight
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(default_weight);
        let min_years = parsed.min_years.filter(|y| y.is_finite() && *y >= 0.0);

        Requirement {
            text: parsed.text.trim().to_string(),
            tags: parsed.tags,
            must: parsed.must,
            min_years,
            level: parsed.level,
            weight,
        }
    }
}

/// Parses vacancy text into requirements via the reasoning service.
///
/// Requirements with blank text are dropped. An empty result is returned as
/// is; the caller decides that it is a failure.
pub async fn parse_requirements(
    vacancy_text: &str,
    service: &dyn ReasoningService,
) -> Result<Vec<Requirement>, LlmError> {
    let parsed = service
        .extract_requirements(REQUIREMENTS_INSTRUCTIONS, vacancy_text)
        .await?;

    let total = parsed.requirements.len();
    let requirements: Vec<Requirement> = parsed
        .requirements
        .into_iter()
        .map(Requirement::from)
        .filter(|r| !r.text.is_empty())
        .collect();

    if requirements.len() < total {
        warn!(
            "Dropped {} blank requirement(s) from parser output",
            total - requirements.len()
        );
    }

    Ok(requirements)
}
