//! Alert rule engine for on-chain events.
//!
//! This crate provides:
//! - Rule schema (flat AND/OR condition chains and explicit match trees)
//! - Validation with structured errors and "did you mean" suggestions
//! - Condition and rule evaluation against event attribute maps
//! - Per-rule cooldown tracking with atomic check-and-set
//! - The rule engine with priority ordering and per-rule fault isolation
//! - A bounded per-rule audit log
//! - YAML rule file loading

pub mod audit_log;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod scoring;
pub mod validation;

pub use engine::{AlertCreationRequest, ProcessOutcome, RuleEngine};
pub use error::{Result, RuleError};
