//! Filesystem rule loader.
//!
//! Reads rule definitions from a directory of YAML files so a deployment can
//! ship its rule set alongside the binary. Loaded definitions are validated
//! here and registered through the engine like any API-created rule.

mod core;
mod result;

#[cfg(test)]
mod tests;

pub use self::core::RuleLoader;
pub use self::result::{LoadResult, LoadStatus};
