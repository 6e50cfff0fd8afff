//! Rule validation with structured errors and suggestions.
//!
//! Validates every aspect of a [`RuleDefinition`] before it is registered:
//! identity, conditions (operator/value compatibility), match trees, cooldown,
//! and the alert template. Returns a [`ValidationResult`] with errors (block
//! creation) and warnings (advisory).

mod condition_checks;
mod template_checks;

pub mod fuzzy;

use crate::schema::*;
use serde::{Deserialize, Serialize};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"conditions[1].value"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// One-line rendering of all errors, used in error messages and logs.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                if e.path.is_empty() {
                    e.message.clone()
                } else {
                    format!("{}: {}", e.path, e.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a [`RuleDefinition`] before registration.
pub fn validate_definition(def: &RuleDefinition) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_identity(def, &mut result);
    condition_checks::validate_match_logic(def, &mut result);
    validate_cooldown(def, &mut result);
    template_checks::validate_alert_template(&def.alert, &mut result);
    result
}

/// Parse a YAML rule definition and validate it. Parse errors are reported
/// as a single root-level error.
pub fn validate_yaml(yaml: &str) -> ValidationResult {
    match serde_yaml::from_str::<RuleDefinition>(yaml) {
        Ok(def) => validate_definition(&def),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error("", format!("YAML parse error: {e}"));
            result
        }
    }
}

fn validate_identity(def: &RuleDefinition, result: &mut ValidationResult) {
    if def.name.trim().is_empty() {
        result.error("name", "name must not be empty");
    }

    if let Some(id) = &def.id {
        if !fuzzy::is_kebab_case(id) {
            result.error(
                "id",
                format!("id must be kebab-case (lowercase alphanumeric + hyphens), got '{id}'"),
            );
        }
    }
}

fn validate_cooldown(def: &RuleDefinition, result: &mut ValidationResult) {
    if def.cooldown_minutes < 0 {
        result.error(
            "cooldownMinutes",
            format!("cooldownMinutes must be >= 0, got {}", def.cooldown_minutes),
        );
    } else if def.cooldown_minutes > u32::MAX as i64 {
        result.error("cooldownMinutes", "cooldownMinutes is out of range");
    }
}
