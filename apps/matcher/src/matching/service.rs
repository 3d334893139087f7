//! The reasoning-service seam: the three call shapes the pipeline needs.
//!
//! `LlmClient` is the production implementation; tests plug in a scripted double.

use async_trait::async_trait;

use crate::llm_client::{InputPart, LlmClient, LlmError};
use crate::matching::prompts::{
    requirements_schema, scores_schema, REQUIREMENTS_JSON_PREFIX, REQUIREMENTS_SCHEMA_NAME,
    RESUME_TEXT_PREFIX, SCORES_SCHEMA_NAME, VACANCY_TEXT_PREFIX,
};
use crate::matching::requirements::VacancyRequirements;
use crate::matching::scorer::{RequirementScores, ResumeSource};

#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Structured extraction of a requirement list from free vacancy text.
    async fn extract_requirements(
        &self,
        instructions: &str,
        vacancy_text: &str,
    ) -> Result<VacancyRequirements, LlmError>;

    /// Structured per-requirement scoring of a resume given inline or by file.
    async fn score_requirements(
        &self,
        instructions: &str,
        requirements_json: &str,
        resume: ResumeSource<'_>,
    ) -> Result<RequirementScores, LlmError>;

    /// Registers raw resume bytes and returns an opaque handle.
    async fn upload_file(&self, filename: &str, bytes: &[u8]) -> Result<String, LlmError>;
}

#[async_trait]
impl ReasoningService for LlmClient {
    async fn extract_requirements(
        &self,
        instructions: &str,
        vacancy_text: &str,
    ) -> Result<VacancyRequirements, LlmError> {
        let input = format!("{VACANCY_TEXT_PREFIX}{vacancy_text}");
        self.parse(
            instructions,
            vec![InputPart::InputText { text: &input }],
            REQUIREMENTS_SCHEMA_NAME,
            &requirements_schema(),
        )
        .await
    }

    async fn score_requirements(
        &self,
        instructions: &str,
        requirements_json: &str,
        resume: ResumeSource<'_>,
    ) -> Result<RequirementScores, LlmError> {
        let requirements_text = format!("{REQUIREMENTS_JSON_PREFIX}{requirements_json}");
        let resume_text;
        let resume_part = match resume {
            ResumeSource::Text(text) => {
                resume_text = format!("{RESUME_TEXT_PREFIX}{text}");
                InputPart::InputText { text: &resume_text }
            }
            ResumeSource::File(file_id) => InputPart::InputFile { file_id },
        };

        self.parse(
            instructions,
            vec![
                InputPart::InputText {
                    text: &requirements_text,
                },
                resume_part,
            ],
            SCORES_SCHEMA_NAME,
            &scores_schema(),
        )
        .await
    }

    async fn upload_file(&self, filename: &str, bytes: &[u8]) -> Result<String, LlmError> {
        LlmClient::upload_file(self, filename, bytes).await
    }
}
