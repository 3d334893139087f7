//! Shared fixtures and in-memory doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, ExtractMode, MatchingConfig, OcrConfig};
use crate::errors::StorageError;
use crate::llm_client::LlmError;
use crate::matching::cache::{decode_payload, CachePayload, CacheStore};
use crate::matching::requirements::{ParsedRequirement, Requirement, VacancyRequirements};
use crate::matching::scorer::{RequirementScores, ResumeSource, ScoredRequirement};
use crate::matching::service::ReasoningService;
use crate::matching::vacancy::VacancySource;
use crate::models::vacancy::VacancyRow;

pub fn ocr_config(enabled: bool) -> OcrConfig {
    OcrConfig {
        enabled,
        language: "eng".to_string(),
        tesseract_cmd: "tesseract".to_string(),
        pdftoppm_cmd: "pdftoppm".to_string(),
        command_timeout: Duration::from_secs(30),
    }
}

pub fn matching_config(mode: ExtractMode) -> MatchingConfig {
    MatchingConfig {
        model: "gpt-4o".to_string(),
        extract_mode: mode,
        ocr: ocr_config(false),
        prompt_version: "2025-08-11a".to_string(),
        rules_version: "2025-08-11a".to_string(),
    }
}

pub fn test_config(mode: ExtractMode) -> Config {
    Config {
        database_url: "postgres://localhost/matcher_test".to_string(),
        openai_api_key: "sk-test".to_string(),
        openai_base_url: "http://localhost:1/v1".to_string(),
        llm_model: "gpt-4o".to_string(),
        max_output_tokens: 1200,
        extract_mode: mode,
        ocr_enabled: false,
        ocr_language: "eng".to_string(),
        tesseract_cmd: "tesseract".to_string(),
        pdftoppm_cmd: "pdftoppm".to_string(),
        ocr_timeout: Duration::from_secs(30),
        prompt_version: "2025-08-11a".to_string(),
        rules_version: "2025-08-11a".to_string(),
        llm_timeout: Duration::from_secs(5),
        match_timeout: Duration::from_secs(5),
        max_resume_bytes: 1024 * 1024,
        port: 0,
        rust_log: "info".to_string(),
    }
}

pub fn requirement(text: &str, must: bool, weight: f64) -> Requirement {
    Requirement {
        text: text.to_string(),
        tags: vec![],
        must,
        min_years: None,
        level: None,
        weight,
    }
}

pub fn parsed_requirement(text: &str, must: bool) -> ParsedRequirement {
    ParsedRequirement {
        text: text.to_string(),
        tags: vec![],
        must,
        min_years: None,
        level: None,
        weight: None,
    }
}

pub fn scored(index: i64, status: f64, evidence: &[&str]) -> ScoredRequirement {
    ScoredRequirement {
        req_index: index,
        status,
        years: None,
        evidence: evidence.iter().map(|e| e.to_string()).collect(),
        notes: None,
    }
}

pub fn vacancy(name: &str, description: &str, requirements: &str) -> VacancyRow {
    VacancyRow {
        name: Some(name.to_string()),
        description: Some(description.to_string()),
        requirements: Some(requirements.to_string()),
    }
}

/// Cache double that stores serialized payloads, so every read goes through
/// the same JSON decoding as the Postgres store.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryCacheStore {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Stores `payload_json` verbatim, bypassing serialization.
    pub fn insert_raw(&self, key: &str, payload_json: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), payload_json.to_string());
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CachePayload>, StorageError> {
        let raw = self.entries.lock().unwrap().get(key).cloned();
        match raw {
            Some(json) => decode_payload(key, &json),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &CachePayload) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolClosed));
        }
        let json = serde_json::to_string(payload)?;
        self.entries.lock().unwrap().insert(key.to_string(), json);
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticVacancies {
    rows: HashMap<i64, VacancyRow>,
}

impl StaticVacancies {
    pub fn with(mut self, vacancy_id: i64, row: VacancyRow) -> Self {
        self.rows.insert(vacancy_id, row);
        self
    }
}

#[async_trait]
impl VacancySource for StaticVacancies {
    async fn get_vacancy(&self, vacancy_id: i64) -> Result<Option<VacancyRow>, StorageError> {
        Ok(self.rows.get(&vacancy_id).cloned())
    }
}

/// What a [`ScriptedService`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct ServiceCalls {
    pub extract: usize,
    pub score_text: usize,
    pub score_file: usize,
    pub upload: usize,
    pub last_requirements_json: Option<String>,
    pub last_resume_text: Option<String>,
    pub last_file_id: Option<String>,
}

impl ServiceCalls {
    pub fn total(&self) -> usize {
        self.extract + self.score_text + self.score_file + self.upload
    }
}

/// Reasoning-service double returning canned answers and recording calls.
pub struct ScriptedService {
    requirements: Vec<ParsedRequirement>,
    scores: Vec<ScoredRequirement>,
    file_id: String,
    fail_scores: bool,
    delay: Option<Duration>,
    calls: Mutex<ServiceCalls>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self {
            requirements: vec![],
            scores: vec![],
            file_id: "file-test".to_string(),
            fail_scores: false,
            delay: None,
            calls: Mutex::new(ServiceCalls::default()),
        }
    }
}

impl ScriptedService {
    pub fn with_requirements(mut self, requirements: Vec<ParsedRequirement>) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_scores(mut self, scores: Vec<ScoredRequirement>) -> Self {
        self.scores = scores;
        self
    }

    pub fn with_file_id(mut self, file_id: &str) -> Self {
        self.file_id = file_id.to_string();
        self
    }

    pub fn failing_scores(mut self) -> Self {
        self.fail_scores = true;
        self
    }

    /// Makes every call sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn calls(&self) -> ServiceCalls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedService {
    async fn extract_requirements(
        &self,
        _instructions: &str,
        _vacancy_text: &str,
    ) -> Result<VacancyRequirements, LlmError> {
        self.calls.lock().unwrap().extract += 1;
        self.pause().await;
        Ok(VacancyRequirements {
            requirements: self.requirements.clone(),
        })
    }

    async fn score_requirements(
        &self,
        _instructions: &str,
        requirements_json: &str,
        resume: ResumeSource<'_>,
    ) -> Result<RequirementScores, LlmError> {
        {
            let mut calls = self.calls.lock().unwrap();
            match resume {
                ResumeSource::Text(text) => {
                    calls.score_text += 1;
                    calls.last_resume_text = Some(text.to_string());
                }
                ResumeSource::File(file_id) => {
                    calls.score_file += 1;
                    calls.last_file_id = Some(file_id.to_string());
                }
            }
            calls.last_requirements_json = Some(requirements_json.to_string());
        }

        self.pause().await;
        if self.fail_scores {
            return Err(LlmError::EmptyContent);
        }
        Ok(RequirementScores {
            per_requirement: self.scores.clone(),
        })
    }

    async fn upload_file(&self, _filename: &str, _bytes: &[u8]) -> Result<String, LlmError> {
        self.calls.lock().unwrap().upload += 1;
        Ok(self.file_id.clone())
    }
}

/// Builds a small PDF with one page per entry: `Some(text)` draws the text in
/// Helvetica, `None` leaves the page without a text layer.
pub fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let page_count = pages.len();
    let mut objects: Vec<String> = Vec::new();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + i * 2))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!(
        "<< /Type /Pages /Kids [{kids}] /Count {page_count} >>"
    ));
    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );

    for (i, page) in pages.iter().enumerate() {
        let content_id = 5 + i * 2;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
        ));

        let stream = match page {
            Some(text) => {
                let escaped = text
                    .replace('\\', "\\\\")
                    .replace('(', "\\(")
                    .replace(')', "\\)");
                format!("BT /F1 12 Tf 72 720 Td ({escaped}) Tj ET")
            }
            None => String::new(),
        };
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for offset in offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));

    out.into_bytes()
}
