pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_resume_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/vacancies/:vacancy_id/score",
            post(handlers::handle_score_resume),
        )
        .route(
            "/api/v1/vacancies/:vacancy_id/requirements",
            get(handlers::handle_get_requirements),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
