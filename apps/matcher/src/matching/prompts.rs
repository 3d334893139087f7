// All LLM instructions and output schemas for the matching pipeline.
// Schemas are strict: every property is required, optional values are nullable.

use serde_json::{json, Value};

/// Instructions for turning vacancy text into an atomic requirement checklist.
pub const REQUIREMENTS_INSTRUCTIONS: &str = "Extract a concise checklist of job requirements.\n\
    - Split composite items into atomic requirements (e.g., 'replication, migrations, backups' -> three lines).\n\
    - Set must=true for mandatory items; otherwise false.\n\
    - Infer min_years/level if explicitly present.\n\
    - Keep tags short (e.g., 'postgresql','replication','backup').\n\
    - Only include weight if explicitly implied; otherwise leave it null.";

/// Scoring instructions when the resume arrives as extracted text.
pub const SCORE_TEXT_INSTRUCTIONS: &str = "You are an ATS evaluator.\n\
    - For each requirement return status in {1, 0.5, 0}.\n\
    - Evidence must be verbatim quotes from the provided resume TEXT; avoid hallucinations.\n\
    - If years of experience can be inferred, include it in 'years'.\n\
    - No duplicate evidence strings. If no relevant quote exists, set status=0.";

/// Scoring instructions when the resume arrives as an uploaded file.
pub const SCORE_FILE_INSTRUCTIONS: &str = "You are an ATS evaluator.\n\
    - For each requirement return status in {1, 0.5, 0}.\n\
    - Include 1–2 verbatim quotes from the resume as evidence; avoid hallucinations.\n\
    - If years of experience can be inferred, include it in 'years'.\n\
    - Reject non-relevant quotes; do not duplicate evidence strings.\n\
    - If no relevant quote exists, set status=0.";

pub const VACANCY_TEXT_PREFIX: &str = "Vacancy text:\n";
pub const REQUIREMENTS_JSON_PREFIX: &str = "Requirements JSON:\n";
pub const RESUME_TEXT_PREFIX: &str = "RESUME TEXT (verbatim):\n";

pub const REQUIREMENTS_SCHEMA_NAME: &str = "vacancy_requirements";
pub const SCORES_SCHEMA_NAME: &str = "requirement_scores";

pub fn requirements_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["requirements"],
        "properties": {
            "requirements": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["text", "tags", "must", "min_years", "level", "weight"],
                    "properties": {
                        "text": {"type": "string"},
                        "tags": {"type": "array", "items": {"type": "string"}},
                        "must": {"type": "boolean"},
                        "min_years": {"type": ["number", "null"]},
                        "level": {"type": ["string", "null"]},
                        "weight": {"type": ["number", "null"]}
                    }
                }
            }
        }
    })
}

pub fn scores_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["per_requirement"],
        "properties": {
            "per_requirement": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["req_index", "status", "years", "evidence", "notes"],
                    "properties": {
                        "req_index": {"type": "integer"},
                        "status": {"type": "number", "enum": [0, 0.5, 1]},
                        "years": {"type": ["number", "null"]},
                        "evidence": {"type": "array", "items": {"type": "string"}},
                        "notes": {"type": ["string", "null"]}
                    }
                }
            }
        }
    })
}
