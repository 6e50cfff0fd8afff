use std::time::Instant;

use crate::pipeline::AlertPipeline;

pub struct AppState {
    pub pipeline: AlertPipeline,
    /// `*` for any origin, otherwise a single allowed origin.
    pub cors_origin: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: AlertPipeline, cors_origin: impl Into<String>) -> Self {
        Self {
            pipeline,
            cors_origin: cors_origin.into(),
            started_at: Instant::now(),
        }
    }
}
