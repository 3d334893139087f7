//! Content-addressed cache keys.
//!
//! Each key is a SHA-256 over a domain tag followed by the byte parts, in
//! order, with no separators. The layout is shared with caches already
//! populated in production, so changing it silently invalidates every entry.

use sha2::{Digest, Sha256};

use crate::config::MatchingConfig;

const REQUIREMENTS_DOMAIN: &[u8] = b"reqs";
const FINAL_DOMAIN: &[u8] = b"final";
const FILE_ID_DOMAIN: &[u8] = b"fileid";

/// Returns the 64-character lowercase hex SHA-256 of `domain` followed by `parts`.
pub fn digest(domain: &[u8], parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 of extracted resume text, used inside the text-path final key.
pub fn text_sha256(text: &str) -> String {
    digest(b"", &[text.as_bytes()])
}

/// Key for a vacancy's parsed requirement checklist.
pub fn requirements_key(config: &MatchingConfig, vacancy_text: &str) -> String {
    digest(
        REQUIREMENTS_DOMAIN,
        &[
            config.model.as_bytes(),
            config.prompt_version.as_bytes(),
            vacancy_text.as_bytes(),
        ],
    )
}

/// Key for a final result scored from locally extracted resume text.
pub fn final_key_from_text(
    config: &MatchingConfig,
    vacancy_text: &str,
    resume_text_sha: &str,
) -> String {
    final_key(config, vacancy_text, resume_text_sha.as_bytes())
}

/// Key for a final result scored from the uploaded PDF.
pub fn final_key_from_bytes(
    config: &MatchingConfig,
    vacancy_text: &str,
    resume_bytes: &[u8],
) -> String {
    final_key(config, vacancy_text, resume_bytes)
}

fn final_key(config: &MatchingConfig, vacancy_text: &str, resume_part: &[u8]) -> String {
    digest(
        FINAL_DOMAIN,
        &[
            config.model.as_bytes(),
            config.extract_mode.as_str().as_bytes(),
            config.prompt_version.as_bytes(),
            config.rules_version.as_bytes(),
            vacancy_text.as_bytes(),
            resume_part,
        ],
    )
}

/// Key for the upload handle of a PDF. Depends on the bytes alone so a prompt
/// or model change never forces a re-upload.
pub fn file_id_key(resume_bytes: &[u8]) -> String {
    digest(FILE_ID_DOMAIN, &[resume_bytes])
}
