//! Tests for the rule loader module.

use std::fs;

use tempfile::TempDir;

use super::*;
use crate::error::RuleError;

const VALID_RULE_YAML: &str = r#"
id: whale-transfer
name: Whale transfer
category: whale
priority: 10
cooldownMinutes: 15
conditions:
  - field: transferAmountUsd
    operator: gt
    value: 1000000
  - field: walletAge
    operator: lt
    value: 30
    logicalOperator: AND
"#;

const INVALID_RULE_YAML: &str = r#"
name: Broken
category: defi
cooldownMinutes: -5
conditions:
  - field: apy
    operator: gt
    value: "fifty"
"#;

fn temp_loader() -> (TempDir, RuleLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = RuleLoader::new(dir.path());
    (dir, loader)
}

#[test]
fn load_rule_from_file() {
    let (dir, loader) = temp_loader();
    let rule_path = dir.path().join("whale.yml");
    fs::write(&rule_path, VALID_RULE_YAML).unwrap();

    let def = loader.load_file(&rule_path).unwrap();
    assert_eq!(def.id.as_deref(), Some("whale-transfer"));
    assert_eq!(def.conditions.len(), 2);
    assert_eq!(def.cooldown_minutes, 15);
}

#[test]
fn load_all_skips_dotfiles_and_non_yaml() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("rule1.yml"), VALID_RULE_YAML).unwrap();
    fs::write(dir.path().join(".hidden.yml"), VALID_RULE_YAML).unwrap();
    fs::write(dir.path().join("readme.txt"), "not a rule").unwrap();

    let results = loader.load_all().unwrap();

    let loaded = results.iter().filter(|r| r.definition().is_some()).count();
    let skipped = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Skipped { .. }))
        .count();
    assert_eq!(loaded, 1);
    assert_eq!(skipped, 2);
}

#[test]
fn load_all_recursive_subdirectories() {
    let (dir, loader) = temp_loader();
    let nested = dir.path().join("whale").join("eth");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("whale.yaml"), VALID_RULE_YAML).unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git").join("x.yml"), VALID_RULE_YAML).unwrap();

    let results = loader.load_all().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].definition().is_some());
}

#[test]
fn invalid_rule_is_reported_not_loaded() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("good.yml"), VALID_RULE_YAML).unwrap();
    fs::write(dir.path().join("bad.yml"), INVALID_RULE_YAML).unwrap();
    fs::write(dir.path().join("garbage.yml"), "name: [unclosed").unwrap();

    let results = loader.load_all().unwrap();
    let failed: Vec<_> = results
        .iter()
        .filter_map(|r| match &r.status {
            LoadStatus::Failed { error } => Some(error.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().any(|e| e.contains("cooldownMinutes")));

    let err = loader.load_file(&dir.path().join("bad.yml")).unwrap_err();
    match err {
        RuleError::Validation(v) => assert!(v.errors.len() >= 2),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn missing_directory_is_empty() {
    let loader = RuleLoader::new("/nonexistent/chainwatch/rules");
    assert!(loader.load_all().unwrap().is_empty());
}
