//! HTTP surface and process wiring for the chainwatch alert engine.

pub mod api;
pub mod pipeline;
pub mod router;
pub mod startup;
pub mod state;

pub use pipeline::{AlertPipeline, SubmitOutcome};
pub use router::build_router;
pub use state::AppState;
