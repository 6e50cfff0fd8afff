//! Per-file load outcomes.

use std::path::PathBuf;

use crate::schema::RuleDefinition;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Definition parsed and passed validation.
    Loaded { definition: Box<RuleDefinition> },
    /// File was skipped (dotfile, non-YAML, etc.).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}

impl LoadResult {
    pub fn definition(&self) -> Option<&RuleDefinition> {
        match &self.status {
            LoadStatus::Loaded { definition } => Some(definition),
            _ => None,
        }
    }
}
