use crate::alert::AlertId;

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Alert not found: {0}")]
    NotFound(AlertId),
}
