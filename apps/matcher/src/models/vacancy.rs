use sqlx::FromRow;

/// The fields of a vacancy that make up its matchable text.
#[derive(Debug, Clone, FromRow)]
pub struct VacancyRow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
}
