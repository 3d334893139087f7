//! Matching Orchestrator: scores one resume against one vacancy.
//!
//! Flow: fetch vacancy → requirements (cached) → extract resume text →
//!       choose strategy + final key → cache check (short-circuit on hit) →
//!       upload handle if needed (cached) → score → aggregate → cache write.
//!
//! Nothing is retained between calls except what lives in the cache store.
//! The final result is written only after aggregation completes, so a request
//! cancelled mid-flight never leaves a partial result behind.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ExtractMode, MatchingConfig};
use crate::errors::StorageError;
use crate::llm_client::LlmError;
use crate::matching::aggregate::{aggregate, build_explanation, MatchMeta, MatchResult, ModelInfo, Skills};
use crate::matching::cache::{CachePayload, CacheStore, FileIdPayload, RequirementsPayload};
use crate::matching::extract::{extract_resume_text, Extraction};
use crate::matching::hashing;
use crate::matching::requirements::{parse_requirements, Requirement};
use crate::matching::scorer::{score_requirements, ResumeSource, ScoringStrategy};
use crate::matching::service::ReasoningService;
use crate::matching::vacancy::{vacancy_text, VacancySource};

const UPLOAD_FILENAME: &str = "resume.pdf";

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("vacancy not found")]
    VacancyNotFound,

    #[error("requirements parse failed")]
    RequirementsParseFailed,

    #[error("resume input unavailable")]
    ResumeInputUnavailable,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Reasoning service error: {0}")]
    Reasoning(#[from] LlmError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatchError {
    /// The error key surfaced to the bot for user-facing failures.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            MatchError::VacancyNotFound => Some("vacancy_not_found"),
            MatchError::RequirementsParseFailed => Some("requirements_parse_failed"),
            MatchError::ResumeInputUnavailable => Some("resume_input_unavailable"),
            _ => None,
        }
    }
}

/// What the pipeline will score from, decided once per request.
enum ScoringPlan {
    Text(String),
    File,
}

impl ScoringPlan {
    fn strategy(&self) -> ScoringStrategy {
        match self {
            ScoringPlan::Text(_) => ScoringStrategy::Text,
            ScoringPlan::File => ScoringStrategy::File,
        }
    }
}

pub struct Matcher {
    service: Arc<dyn ReasoningService>,
    cache: Arc<dyn CacheStore>,
    vacancies: Arc<dyn VacancySource>,
    config: MatchingConfig,
}

impl Matcher {
    pub fn new(
        service: Arc<dyn ReasoningService>,
        cache: Arc<dyn CacheStore>,
        vacancies: Arc<dyn VacancySource>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            service,
            cache,
            vacancies,
            config,
        }
    }

    /// Scores `resume_bytes` (a PDF) against the vacancy `vacancy_id`.
    pub async fn score_resume(
        &self,
        vacancy_id: i64,
        resume_bytes: &[u8],
    ) -> Result<MatchResult, MatchError> {
        let vacancy_text = self.fetch_vacancy_text(vacancy_id).await?;
        let requirements = self.requirements_for_text(&vacancy_text).await?;

        let plan = self.decide_plan(resume_bytes).await?;
        let final_key = match &plan {
            ScoringPlan::Text(text) => hashing::final_key_from_text(
                &self.config,
                &vacancy_text,
                &hashing::text_sha256(text),
            ),
            ScoringPlan::File => {
                hashing::final_key_from_bytes(&self.config, &vacancy_text, resume_bytes)
            }
        };

        match self.cache.get(&final_key).await? {
            Some(CachePayload::FinalScore(cached)) => {
                info!(
                    "Final score cache hit for vacancy {vacancy_id}: {}",
                    cached.score_overall
                );
                return Ok(cached);
            }
            Some(other) => warn!(
                "Final key {final_key} holds a {} payload, recomputing",
                other.kind()
            ),
            None => {}
        }

        let strategy = plan.strategy();
        info!(
            "Scoring vacancy {vacancy_id} against {} requirements via {}",
            requirements.len(),
            strategy.input_mode()
        );

        let scored = match &plan {
            ScoringPlan::Text(text) => {
                score_requirements(self.service.as_ref(), ResumeSource::Text(text), &requirements)
                    .await?
            }
            ScoringPlan::File => {
                let file_id = self.upload_handle(resume_bytes).await?;
                score_requirements(
                    self.service.as_ref(),
                    ResumeSource::File(&file_id),
                    &requirements,
                )
                .await?
            }
        };

        let totals = aggregate(&requirements, &scored);
        let input_mode = strategy.input_mode();
        let result = MatchResult {
            score_overall: totals.score_overall,
            subscores: totals.subscores,
            skills: Skills {
                matched: totals.matched,
                missing: totals.missing,
            },
            highlights: totals.highlights,
            explanations: build_explanation(
                input_mode,
                &self.config.prompt_version,
                &self.config.rules_version,
            ),
            model_info: ModelInfo {
                llm_model: self.config.model.clone(),
            },
            meta: MatchMeta {
                prompt_version: self.config.prompt_version.clone(),
                rules_version: self.config.rules_version.clone(),
                input_mode: input_mode.to_string(),
            },
        };

        self.cache
            .set(&final_key, &CachePayload::FinalScore(result.clone()))
            .await?;

        info!(
            "Vacancy {vacancy_id} scored {} (must {}, optional {})",
            result.score_overall, result.subscores.must_have, result.subscores.optional
        );
        Ok(result)
    }

    /// Returns the parsed requirement checklist for a vacancy, from cache when possible.
    pub async fn requirements(&self, vacancy_id: i64) -> Result<Vec<Requirement>, MatchError> {
        let vacancy_text = self.fetch_vacancy_text(vacancy_id).await?;
        self.requirements_for_text(&vacancy_text).await
    }

    async fn fetch_vacancy_text(&self, vacancy_id: i64) -> Result<String, MatchError> {
        let row = self
            .vacancies
            .get_vacancy(vacancy_id)
            .await?
            .ok_or(MatchError::VacancyNotFound)?;

        let text = vacancy_text(&row);
        if text.is_empty() {
            warn!("Vacancy {vacancy_id} has no usable text");
            return Err(MatchError::VacancyNotFound);
        }
        Ok(text)
    }

    async fn requirements_for_text(
        &self,
        vacancy_text: &str,
    ) -> Result<Vec<Requirement>, MatchError> {
        let key = hashing::requirements_key(&self.config, vacancy_text);

        if let Some(CachePayload::Requirements(cached)) = self.cache.get(&key).await? {
            info!("Requirements cache hit ({} items)", cached.requirements.len());
            return Ok(cached.requirements);
        }

        let requirements = parse_requirements(vacancy_text, self.service.as_ref()).await?;
        if requirements.is_empty() {
            warn!("Requirement parser returned no requirements");
            return Err(MatchError::RequirementsParseFailed);
        }

        self.cache
            .set(
                &key,
                &CachePayload::Requirements(RequirementsPayload {
                    requirements: requirements.clone(),
                    prompt_version: self.config.prompt_version.clone(),
                    model: self.config.model.clone(),
                }),
            )
            .await?;

        info!("Parsed and cached {} requirements", requirements.len());
        Ok(requirements)
    }

    /// Chooses text or file scoring. Local mode falls back to the file
    /// strategy for this request only when neither extraction tier yields text.
    async fn decide_plan(&self, resume_bytes: &[u8]) -> Result<ScoringPlan, MatchError> {
        if self.config.extract_mode == ExtractMode::Llm {
            return Ok(ScoringPlan::File);
        }

        let extraction = extract_resume_text(resume_bytes, &self.config.ocr)
            .await
            .map_err(|e| MatchError::Internal(format!("resume extraction task failed: {e}")))?;

        info!("Resume extraction tier: {}", extraction.tier());
        match extraction {
            Extraction::Digital(text) | Extraction::Ocr(text) => Ok(ScoringPlan::Text(text)),
            Extraction::None => {
                warn!("No local resume text, falling back to file-based scoring");
                Ok(ScoringPlan::File)
            }
        }
    }

    /// Reuses the upload handle for identical bytes, uploading at most once.
    async fn upload_handle(&self, resume_bytes: &[u8]) -> Result<String, MatchError> {
        let key = hashing::file_id_key(resume_bytes);

        if let Some(CachePayload::FileId(cached)) = self.cache.get(&key).await? {
            if !cached.file_id.is_empty() {
                info!("Reusing uploaded resume {}", cached.file_id);
                return Ok(cached.file_id);
            }
        }

        let file_id = self
            .service
            .upload_file(UPLOAD_FILENAME, resume_bytes)
            .await?;
        if file_id.trim().is_empty() {
            return Err(MatchError::ResumeInputUnavailable);
        }

        self.cache
            .set(
                &key,
                &CachePayload::FileId(FileIdPayload {
                    file_id: file_id.clone(),
                }),
            )
            .await?;

        info!("Uploaded resume as {file_id}");
        Ok(file_id)
    }
}
