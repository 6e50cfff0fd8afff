//! Alert entity, in-memory alert store and lifecycle transitions.

pub mod alert;
pub mod error;
pub mod filter;
pub mod store;

pub use alert::{Alert, AlertId, AlertSummary};
pub use error::AlertError;
pub use filter::AlertFilter;
pub use store::{AlertCounts, AlertStore};
