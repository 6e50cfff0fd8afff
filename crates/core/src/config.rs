use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub rules: RulesConfig,
    pub dispatch: DispatchConfig,
    pub audit: AuditConfig,
    pub channels: ChannelsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CHAINWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CHAINWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            rules: RulesConfig::from_env_profiled(p),
            dispatch: DispatchConfig::from_env_profiled(p),
            audit: AuditConfig::from_env_profiled(p),
            channels: ChannelsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject settings the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.dispatch.max_concurrent == 0 {
            return Err(CoreError::Config {
                key: "DISPATCH_MAX_CONCURRENT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.dispatch.max_attempts == 0 {
            return Err(CoreError::Config {
                key: "DISPATCH_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.dispatch.max_backoff_ms < self.dispatch.initial_backoff_ms {
            return Err(CoreError::Config {
                key: "DISPATCH_MAX_BACKOFF_MS".to_string(),
                message: "must not be smaller than DISPATCH_INITIAL_BACKOFF_MS".to_string(),
            });
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  rules:     dir={}, fault_threshold={}",
            self.rules.rules_dir.display(),
            self.rules.fault_threshold
        );
        tracing::info!(
            "  dispatch:  max_concurrent={}, timeout={}ms, attempts={}",
            self.dispatch.max_concurrent,
            self.dispatch.timeout_ms,
            self.dispatch.max_attempts
        );
        tracing::info!("  audit:     max_entries_per_rule={}", self.audit.max_entries_per_rule);
        tracing::info!(
            "  channels:  webhook={}",
            if self.channels.webhook_url.is_some() { "configured" } else { "(none)" }
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3080),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directory scanned for YAML rule definitions at startup.
    pub rules_dir: PathBuf,
    /// Consecutive evaluation faults before a rule is auto-disabled (0 = never).
    pub fault_threshold: u32,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "RULES_DIR", "data/rules")),
            fault_threshold: profiled_env_u32(p, "RULE_FAULT_THRESHOLD", 5),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("data/rules"),
            fault_threshold: 5,
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on in-flight channel invocations across all alerts.
    pub max_concurrent: usize,
    /// Per-attempt channel timeout.
    pub timeout_ms: u64,
    /// Attempts per action, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl DispatchConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_concurrent: profiled_env_u32(p, "DISPATCH_MAX_CONCURRENT", 16) as usize,
            timeout_ms: profiled_env_u64(p, "DISPATCH_TIMEOUT_MS", 5_000),
            max_attempts: profiled_env_u32(p, "DISPATCH_MAX_ATTEMPTS", 3),
            initial_backoff_ms: profiled_env_u64(p, "DISPATCH_INITIAL_BACKOFF_MS", 200),
            max_backoff_ms: profiled_env_u64(p, "DISPATCH_MAX_BACKOFF_MS", 5_000),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based count of failures so far).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1).min(16));
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            timeout_ms: 5_000,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

// ── Audit ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub max_entries_per_rule: usize,
}

impl AuditConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_entries_per_rule: profiled_env_u32(p, "AUDIT_MAX_ENTRIES_PER_RULE", 500) as usize,
        }
    }
}

// ── Notification channels ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Target for the `webhook` handler ref; unset leaves it unregistered.
    pub webhook_url: Option<String>,
}

impl ChannelsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "WEBHOOK_URL"),
        }
    }
}
