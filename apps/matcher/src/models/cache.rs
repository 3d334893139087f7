use sqlx::FromRow;

/// The stored JSON of one `llm_cache` entry.
#[derive(Debug, Clone, FromRow)]
pub struct CacheRow {
    pub payload_json: String,
}
