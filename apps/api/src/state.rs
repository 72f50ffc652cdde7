use std::sync::Arc;
use std::time::Duration;

use crate::ranking::pipeline::RankingPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RankingPipeline>,
    /// Whole-batch deadline; unfinished resumes are reported as cancelled.
    pub batch_timeout: Duration,
}
