//! Vacancy lookup and assembly of the text that requirements are parsed from.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::StorageError;
use crate::models::vacancy::VacancyRow;

#[async_trait]
pub trait VacancySource: Send + Sync {
    async fn get_vacancy(&self, vacancy_id: i64) -> Result<Option<VacancyRow>, StorageError>;
}

pub struct PgVacancySource {
    pool: PgPool,
}

impl PgVacancySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VacancySource for PgVacancySource {
    async fn get_vacancy(&self, vacancy_id: i64) -> Result<Option<VacancyRow>, StorageError> {
        Ok(sqlx::query_as::<_, VacancyRow>(
            r#"
            SELECT name, description, requirements
            FROM vacancy
            WHERE vacancy_id = $1
            "#,
        )
        .bind(vacancy_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

/// Joins name, description and requirements into one block of text with
/// every line trimmed and blank lines removed. Empty if nothing is usable.
pub fn vacancy_text(row: &VacancyRow) -> String {
    let parts = [&row.name, &row.description, &row.requirements];
    let joined = parts
        .iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    joined
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
