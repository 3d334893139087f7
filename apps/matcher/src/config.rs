use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// How resume text is obtained before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Extract text locally (embedded text layer, then optional OCR) and fall
    /// back to file upload only when that yields nothing.
    Local,
    /// Always upload the PDF and let the reasoning service read it.
    Llm,
}

impl ExtractMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractMode::Local => "local",
            ExtractMode::Llm => "llm",
        }
    }
}

impl FromStr for ExtractMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ExtractMode::Local),
            "llm" => Ok(ExtractMode::Llm),
            other => Err(anyhow!("unknown extraction mode '{other}' (expected local or llm)")),
        }
    }
}

/// External OCR tooling used when a PDF has no embedded text layer.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub enabled: bool,
    pub language: String,
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
    /// Upper bound on each external tool invocation.
    pub command_timeout: Duration,
}

/// The subset of configuration the matching pipeline depends on.
/// Every field that changes scoring output also feeds the cache keys.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub model: String,
    pub extract_mode: ExtractMode,
    pub ocr: OcrConfig,
    pub prompt_version: String,
    pub rules_version: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub llm_model: String,
    pub max_output_tokens: u32,
    pub extract_mode: ExtractMode,
    pub ocr_enabled: bool,
    pub ocr_language: String,
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
    pub ocr_timeout: Duration,
    pub prompt_version: String,
    pub rules_version: String,
    pub llm_timeout: Duration,
    pub match_timeout: Duration,
    pub max_resume_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            openai_api_key: require("OPENAI_API_KEY")?,
            openai_base_url: get("OPENAI_BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            llm_model: get("LLM_MODEL", "gpt-4o"),
            max_output_tokens: get("MAX_OUTPUT_TOKENS", "1200")
                .parse()
                .context("MAX_OUTPUT_TOKENS must be a positive integer")?,
            extract_mode: get("ATS_EXTRACT_MODE", "local")
                .parse()
                .context("ATS_EXTRACT_MODE is invalid")?,
            ocr_enabled: parse_flag(&get("ATS_OCR", "0")),
            ocr_language: get("OCR_LANGUAGE", "eng"),
            tesseract_cmd: get("TESSERACT_CMD", "tesseract"),
            pdftoppm_cmd: get("PDFTOPPM_CMD", "pdftoppm"),
            ocr_timeout: Duration::from_secs(
                get("OCR_TIMEOUT_SECS", "60")
                    .parse()
                    .context("OCR_TIMEOUT_SECS must be a number of seconds")?,
            ),
            prompt_version: get("PROMPT_VERSION", "2025-08-11a"),
            rules_version: get("RULES_VERSION", "2025-08-11a"),
            llm_timeout: Duration::from_secs(
                get("LLM_TIMEOUT_SECS", "60")
                    .parse()
                    .context("LLM_TIMEOUT_SECS must be a number of seconds")?,
            ),
            match_timeout: Duration::from_secs(
                get("MATCH_TIMEOUT_SECS", "180")
                    .parse()
                    .context("MATCH_TIMEOUT_SECS must be a number of seconds")?,
            ),
            max_resume_bytes: get("MAX_RESUME_BYTES", "10485760")
                .parse()
                .context("MAX_RESUME_BYTES must be a byte count")?,
            port: get("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG", "info"),
        })
    }

    pub fn matching(&self) -> MatchingConfig {
        MatchingConfig {
            model: self.llm_model.clone(),
            extract_mode: self.extract_mode,
            ocr: OcrConfig {
                enabled: self.ocr_enabled,
                language: self.ocr_language.clone(),
                tesseract_cmd: self.tesseract_cmd.clone(),
                pdftoppm_cmd: self.pdftoppm_cmd.clone(),
                command_timeout: self.ocr_timeout,
            },
            prompt_version: self.prompt_version.clone(),
            rules_version: self.rules_version.clone(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
