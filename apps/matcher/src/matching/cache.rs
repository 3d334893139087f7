//! Cache Store: idempotent key → payload memoization over the `llm_cache` table.
//!
//! Keys come from `hashing` and never change meaning once written; only the
//! payload may be overwritten. Absence of a key means "recompute", never an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::errors::StorageError;
use crate::matching::aggregate::MatchResult;
use crate::matching::requirements::Requirement;
use crate::models::cache::CacheRow;

/// Cached parse of a vacancy into its requirement checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsPayload {
    pub requirements: Vec<Requirement>,
    pub prompt_version: String,
    pub model: String,
}

/// Cached upload handle for a specific PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIdPayload {
    #[serde(rename = "openai_file_id")]
    pub file_id: String,
}

/// Everything the cache holds, discriminated by the `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePayload {
    Requirements(RequirementsPayload),
    FileId(FileIdPayload),
    FinalScore(MatchResult),
    /// A kind written by a newer release; treated as a miss.
    #[serde(other)]
    Unknown,
}

impl CachePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            CachePayload::Requirements(_) => "requirements",
            CachePayload::FileId(_) => "file_id",
            CachePayload::FinalScore(_) => "final_score",
            CachePayload::Unknown => "unknown",
        }
    }
}

/// Decodes a stored payload. Text that is not JSON is a storage error. A
/// payload whose `kind` is known but whose fields do not decode is treated as
/// absent so the next write replaces it.
pub fn decode_payload(
    key: &str,
    payload_json: &str,
) -> Result<Option<CachePayload>, StorageError> {
    let value: serde_json::Value = serde_json::from_str(payload_json)?;
    match serde_json::from_value::<CachePayload>(value) {
        Ok(payload) => Ok(Some(payload)),
        Err(e) => {
            warn!("Discarding malformed cache payload under {key}: {e}");
            Ok(None)
        }
    }
}

/// Persistent key/payload store shared by all concurrent requests.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachePayload>, StorageError>;

    /// Upserts `payload` under `key`; last write wins on payload content.
    async fn set(&self, key: &str, payload: &CachePayload) -> Result<(), StorageError>;
}

/// Postgres-backed cache store.
pub struct PgCacheStore {
    pool: PgPool,
}

impl PgCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CachePayload>, StorageError> {
        let row = sqlx::query_as::<_, CacheRow>(
            "SELECT payload_json FROM llm_cache WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => decode_payload(key, &row.payload_json),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &CachePayload) -> Result<(), StorageError> {
        let payload_json = serde_json::to_string(payload).map_err(StorageError::Payload)?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO llm_cache (key, payload_json)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET
                payload_json = EXCLUDED.payload_json,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(&payload_json)
        .execute(&mut *tx)
        .await;

        if let Err(e) = result {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback of cache write for {key} failed: {rollback_err}");
            }
            return Err(StorageError::Database(e));
        }
        tx.commit().await?;

        debug!("Cached {} payload under {key}", payload.kind());
        Ok(())
    }
}
