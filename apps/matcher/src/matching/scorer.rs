//! Resume Scorer: grades a resume against each requirement via the reasoning service.
//!
//! Two strategies share one contract: inline extracted text (preferred, no
//! upload) or a previously uploaded file handle. Neither retries on malformed
//! output; that surfaces to the orchestrator as an error.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::llm_client::LlmError;
use crate::matching::prompts::{SCORE_FILE_INSTRUCTIONS, SCORE_TEXT_INSTRUCTIONS};
use crate::matching::requirements::Requirement;
use crate::matching::service::ReasoningService;

/// What the reasoning service reads the resume from.
#[derive(Debug, Clone, Copy)]
pub enum ResumeSource<'a> {
    /// Locally extracted plain text.
    Text(&'a str),
    /// An uploaded file handle.
    File(&'a str),
}

/// The scoring path chosen for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStrategy {
    Text,
    File,
}

impl ScoringStrategy {
    /// Label recorded in result metadata.
    pub fn input_mode(&self) -> &'static str {
        match self {
            ScoringStrategy::Text => "local_text",
            ScoringStrategy::File => "llm_file",
        }
    }
}

/// Per-requirement verdict, addressed by position in the requirement list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRequirement {
    pub req_index: i64,
    /// 1.0 met, 0.5 partially met, 0.0 not met.
    pub status: f64,
    #[serde(default)]
    pub years: Option<f64>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequirementScores {
    pub per_requirement: Vec<ScoredRequirement>,
}

/// Scores `requirements` against the resume in `source`.
pub async fn score_requirements(
    service: &dyn ReasoningService,
    source: ResumeSource<'_>,
    requirements: &[Requirement],
) -> Result<Vec<ScoredRequirement>, LlmError> {
    let instructions = match source {
        ResumeSource::Text(_) => SCORE_TEXT_INSTRUCTIONS,
        ResumeSource::File(_) => SCORE_FILE_INSTRUCTIONS,
    };
    let requirements_json = serde_json::to_string(&json!({ "requirements": requirements }))?;

    let scores = service
        .score_requirements(instructions, &requirements_json, source)
        .await?;
    Ok(scores.per_requirement)
}
