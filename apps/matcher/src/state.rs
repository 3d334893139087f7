use std::sync::Arc;

use crate::config::Config;
use crate::matching::Matcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The scoring pipeline, wired to Postgres and the reasoning service at startup.
    pub matcher: Arc<Matcher>,
    pub config: Config,
}
