use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::matching::aggregate::MatchResult;
use crate::matching::requirements::Requirement;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";

#[derive(Serialize)]
pub struct RequirementsResponse {
    pub vacancy_id: i64,
    pub requirements: Vec<Requirement>,
}

/// POST /api/v1/vacancies/:vacancy_id/score
///
/// Expects a multipart body with the PDF in the `resume` field.
pub async fn handle_score_resume(
    State(state): State<AppState>,
    Path(vacancy_id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<MatchResult>, AppError> {
    let resume = read_resume(multipart).await?;
    info!("Scoring {} byte resume for vacancy {vacancy_id}", resume.len());

    let deadline = state.config.match_timeout;
    let result = tokio::time::timeout(deadline, state.matcher.score_resume(vacancy_id, &resume))
        .await
        .map_err(|_| AppError::Timeout(deadline.as_secs()))??;

    Ok(Json(result))
}

/// GET /api/v1/vacancies/:vacancy_id/requirements
pub async fn handle_get_requirements(
    State(state): State<AppState>,
    Path(vacancy_id): Path<i64>,
) -> Result<Json<RequirementsResponse>, AppError> {
    let deadline = state.config.match_timeout;
    let requirements = tokio::time::timeout(deadline, state.matcher.requirements(vacancy_id))
        .await
        .map_err(|_| AppError::Timeout(deadline.as_secs()))??;

    Ok(Json(RequirementsResponse {
        vacancy_id,
        requirements,
    }))
}

async fn read_resume(mut multipart: Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read resume: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Resume file is empty".to_string()));
        }
        return Ok(bytes);
    }

    Err(AppError::Validation(format!(
        "Missing '{RESUME_FIELD}' file field"
    )))
}
