//! Server startup: rule loading from disk.

use std::path::Path;

use tracing::{info, warn};

use chainwatch_rules::loader::{LoadStatus, RuleLoader};
use chainwatch_rules::RuleEngine;

/// Register every valid rule file under `dir`. Files that fail to load or
/// register are logged and skipped. Returns the number registered.
pub fn load_rules(engine: &RuleEngine, dir: &Path) -> usize {
    let loader = RuleLoader::new(dir);
    let results = match loader.load_all() {
        Ok(results) => results,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to scan rules directory, starting empty");
            return 0;
        }
    };

    let mut registered = 0;
    for result in results {
        match result.status {
            LoadStatus::Loaded { definition } => match engine.create_rule(*definition) {
                Ok(rule) => {
                    registered += 1;
                    info!(rule_id = %rule.id, path = %result.path.display(), "rule registered");
                }
                Err(e) => warn!(path = %result.path.display(), error = %e, "rule not registered"),
            },
            LoadStatus::Failed { error } => {
                warn!(path = %result.path.display(), error = %error, "rule file failed to load");
            }
            LoadStatus::Skipped { .. } => {}
        }
    }

    info!("Loaded {} rules from {}", registered, dir.display());
    registered
}
