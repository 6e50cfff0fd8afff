//! Core [`RuleLoader`] struct: directory scan and per-file parsing.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, RuleError};
use crate::schema::RuleDefinition;
use crate::validation::validate_definition;

use super::result::{LoadResult, LoadStatus};

/// Filesystem-backed rule definition loader.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files, each holding
/// one [`RuleDefinition`]. Files that fail to parse or validate are reported
/// per-file and do not abort the scan.
pub struct RuleLoader {
    /// Root directory containing rule YAML files.
    rules_dir: PathBuf,
}

impl RuleLoader {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// A missing directory yields an empty result. Dotfiles and dot
    /// directories are skipped. Results are sorted by path so that load
    /// order is stable across platforms.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        if !self.rules_dir.exists() {
            warn!(path = %self.rules_dir.display(), "rules directory does not exist");
            return Ok(results);
        }
        self.scan_dir_recursive(&self.rules_dir, &mut results)?;
        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    fn scan_dir_recursive(&self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        for entry in entries {
            let path = entry?.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);

            if !is_yaml {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            let status = match self.load_file(&path) {
                Ok(definition) => {
                    info!(name = %definition.name, path = %path.display(), "loaded rule definition");
                    LoadStatus::Loaded {
                        definition: Box::new(definition),
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    LoadStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(LoadResult { path, status });
        }

        Ok(())
    }

    /// Parse and validate a single rule file.
    ///
    /// Validation warnings are logged; errors reject the file.
    pub fn load_file(&self, path: &Path) -> Result<RuleDefinition> {
        let contents = fs::read_to_string(path)?;
        let definition: RuleDefinition = serde_yaml::from_str(&contents)?;

        let validation = validate_definition(&definition);
        for w in &validation.warnings {
            warn!(path = %path.display(), field = %w.path, "{}", w.message);
        }
        if !validation.valid {
            return Err(RuleError::Validation(validation));
        }
        Ok(definition)
    }
}
