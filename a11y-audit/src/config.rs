//! Configuration for the audit engine
//!
//! Loaded from TOML (see [`a11y_common::config::resolve_config_path`] for
//! file lookup), then overridden by command-line arguments. Every field has
//! a built-in default so a missing file is not an error.
//!
//! ```toml
//! [data]
//! active_csv = "active_tools.csv"
//! removed_csv = "removed_tools.csv"
//! output_dir = "audit_results"
//!
//! [gemini]
//! model = "gemini-2.0-flash"
//! requests_per_minute = 15
//!
//! [audit]
//! batch_size = 15
//!
//! [audit.retry]
//! max_attempts = 3
//!
//! [columns]
//! name = "PRODUCT/FEATURE NAME"
//! ```

use crate::services::similarity::SimilarityThresholds;
use a11y_common::config::{load_toml_config, resolve_config_path, ConfigSource, LoggingConfig};
use a11y_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Application name used for config file lookup
pub const APP_NAME: &str = "a11y-audit";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "A11Y_AUDIT_CONFIG";

/// Environment variable holding the analysis API key
pub const API_KEY_ENV_VAR: &str = "GOOGLE_GEMINI_API_KEY";

/// Root of the TOML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditToml {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub audit: AuditSettings,

    /// Logical field key → source column header
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

/// Input tables and output location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_active_csv")]
    pub active_csv: PathBuf,

    #[serde(default = "default_removed_csv")]
    pub removed_csv: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            active_csv: default_active_csv(),
            removed_csv: default_removed_csv(),
            output_dir: default_output_dir(),
        }
    }
}

/// Analysis API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiConfig {
    /// Used only when the environment variable is not set
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Operations running at once
    #[serde(default = "default_concurrency")]
    pub max_concurrent_operations: usize,

    /// Batches in flight per batched operation
    #[serde(default = "default_concurrency")]
    pub max_concurrent_batches: usize,

    /// Per external call
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub similarity: SimilarityThresholds,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_operations: default_concurrency(),
            max_concurrent_batches: default_concurrency(),
            call_timeout_ms: default_call_timeout_ms(),
            retry: RetryConfig::default(),
            similarity: SimilarityThresholds::default(),
        }
    }
}

impl AuditSettings {
    pub fn batch_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.batch_size).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_active_csv() -> PathBuf {
    PathBuf::from("active_tools.csv")
}

fn default_removed_csv() -> PathBuf {
    PathBuf::from("removed_tools.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("audit_results")
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_requests_per_minute() -> u32 {
    15
}

fn default_batch_size() -> usize {
    15
}

fn default_concurrency() -> usize {
    2
}

fn default_call_timeout_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl AuditToml {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let audit = &self.audit;
        if audit.batch_size == 0 {
            return Err(Error::Config("audit.batch_size must be at least 1".to_string()));
        }
        if audit.max_concurrent_operations == 0 || audit.max_concurrent_batches == 0 {
            return Err(Error::Config("audit concurrency limits must be at least 1".to_string()));
        }
        if audit.retry.max_attempts == 0 {
            return Err(Error::Config("audit.retry.max_attempts must be at least 1".to_string()));
        }
        if audit.retry.multiplier < 1.0 {
            return Err(Error::Config("audit.retry.multiplier must be >= 1.0".to_string()));
        }
        if audit.call_timeout_ms == 0 {
            return Err(Error::Config("audit.call_timeout_ms must be positive".to_string()));
        }
        if self.gemini.requests_per_minute == 0 {
            return Err(Error::Config("gemini.requests_per_minute must be at least 1".to_string()));
        }
        audit.similarity.validate()
    }
}

/// Locate and load the config file, falling back to defaults when none exists
pub fn load_audit_config(cli_path: Option<&Path>) -> Result<(AuditToml, Option<PathBuf>)> {
    let Some((path, source)) = resolve_config_path(cli_path, CONFIG_ENV_VAR, APP_NAME) else {
        info!("No config file found, using built-in defaults");
        return Ok((AuditToml::default(), None));
    };

    let config: AuditToml = load_toml_config(&path)?;
    match source {
        ConfigSource::CommandLine => info!(path = %path.display(), "Config loaded from command line path"),
        ConfigSource::Environment => info!(path = %path.display(), "Config loaded from {}", CONFIG_ENV_VAR),
        _ => info!(path = %path.display(), "Config loaded"),
    }
    config.validate()?;
    Ok((config, Some(path)))
}

/// Resolve the analysis API key
///
/// **Priority:** ENV → TOML
pub fn resolve_gemini_api_key(config: &AuditToml) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok().filter(|k| is_valid_key(k));
    let toml_key = config.gemini.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Gemini API key found in multiple sources: environment, TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Gemini API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: [gemini] api_key = \"your-key\"",
        API_KEY_ENV_VAR
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuditToml::default();
        assert_eq!(config.audit.batch_size, 15);
        assert_eq!(config.audit.retry.max_attempts, 3);
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.data.output_dir, PathBuf::from("audit_results"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AuditToml = toml::from_str(
            r#"
            [audit]
            batch_size = 5

            [audit.retry]
            max_attempts = 4

            [columns]
            name = "Tool"
            "#,
        )
        .unwrap();

        assert_eq!(config.audit.batch_size, 5);
        assert_eq!(config.audit.max_concurrent_batches, 2);
        assert_eq!(config.audit.retry.max_attempts, 4);
        assert_eq!(config.audit.retry.initial_backoff_ms, 500);
        assert_eq!(config.columns.get("name").map(String::as_str), Some("Tool"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = AuditToml::default();
        config.audit.batch_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = AuditToml::default();
        config.audit.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key("   "));
        assert!(!is_valid_key(""));
    }
}
