//! Error type for rule management and loading.

use crate::validation::ValidationResult;

/// Errors surfaced by rule CRUD and the YAML loader.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The definition failed validation; nothing was stored.
    #[error("Validation failed: {}", .0.summary())]
    Validation(ValidationResult),

    #[error("Rule not found: {0}")]
    NotFound(String),

    /// A rule with the requested id already exists.
    #[error("Rule already exists: {0}")]
    Duplicate(String),

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
