//! Tests for configuration loading and API key resolution
//!
//! Tests that touch GOOGLE_GEMINI_API_KEY or A11Y_AUDIT_CONFIG are marked
//! #[serial] so they never run in parallel.

use a11y_audit::config::{load_audit_config, resolve_gemini_api_key, AuditToml, API_KEY_ENV_VAR, CONFIG_ENV_VAR};
use a11y_audit::error::AuditError;
use a11y_audit::services::GeminiClient;
use a11y_common::Error;
use serial_test::serial;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn toml_with_key(key: Option<&str>) -> AuditToml {
    let mut config = AuditToml::default();
    config.gemini.api_key = key.map(str::to_string);
    config
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ============================================================================
// API key resolution
// ============================================================================

#[test]
#[serial]
fn test_env_key_wins_over_toml() {
    std::env::set_var(API_KEY_ENV_VAR, "env-key");
    let result = resolve_gemini_api_key(&toml_with_key(Some("toml-key")));
    std::env::remove_var(API_KEY_ENV_VAR);

    assert_eq!(result.unwrap(), "env-key");
}

#[test]
#[serial]
fn test_toml_key_used_when_env_missing() {
    std::env::remove_var(API_KEY_ENV_VAR);
    let result = resolve_gemini_api_key(&toml_with_key(Some("toml-key")));
    assert_eq!(result.unwrap(), "toml-key");
}

#[test]
#[serial]
fn test_blank_env_key_falls_back_to_toml() {
    std::env::set_var(API_KEY_ENV_VAR, "   ");
    let result = resolve_gemini_api_key(&toml_with_key(Some("toml-key")));
    std::env::remove_var(API_KEY_ENV_VAR);

    assert_eq!(result.unwrap(), "toml-key");
}

#[test]
#[serial]
fn test_missing_key_is_config_error() {
    std::env::remove_var(API_KEY_ENV_VAR);
    let result = resolve_gemini_api_key(&toml_with_key(None));
    match result {
        Err(Error::Config(message)) => assert!(message.contains(API_KEY_ENV_VAR)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
#[serial]
fn test_client_from_config_without_key_is_recoverable_error() {
    std::env::remove_var(API_KEY_ENV_VAR);
    match GeminiClient::from_config(&toml_with_key(None)) {
        Err(AuditError::Common(Error::Config(message))) => assert!(message.contains("API key")),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("client built without a key"),
    }
}

#[test]
#[serial]
fn test_client_from_config_with_toml_key() {
    std::env::remove_var(API_KEY_ENV_VAR);
    assert!(GeminiClient::from_config(&toml_with_key(Some("toml-key"))).is_ok());
}

// ============================================================================
// Config file loading
// ============================================================================

#[test]
#[serial]
fn test_config_from_env_var() {
    let file = write_config(
        r#"
        [data]
        active_csv = "tools/active.csv"

        [audit]
        batch_size = 10
        "#,
    );
    std::env::set_var(CONFIG_ENV_VAR, file.path());
    let result = load_audit_config(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    let (config, path) = result.unwrap();
    assert_eq!(path.as_deref(), Some(file.path()));
    assert_eq!(config.audit.batch_size, 10);
    assert_eq!(config.data.active_csv.to_str(), Some("tools/active.csv"));
    assert_eq!(config.data.removed_csv.to_str(), Some("removed_tools.csv"));
}

#[test]
#[serial]
fn test_cli_path_wins_over_env_var() {
    let env_file = write_config("[audit]\nbatch_size = 10\n");
    let cli_file = write_config("[audit]\nbatch_size = 20\n");
    std::env::set_var(CONFIG_ENV_VAR, env_file.path());
    let result = load_audit_config(Some(cli_file.path()));
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(result.unwrap().0.audit.batch_size, 20);
}

#[test]
#[serial]
fn test_invalid_values_rejected() {
    let file = write_config("[audit]\nbatch_size = 0\n");
    let result = load_audit_config(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_explicit_missing_path_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = load_audit_config(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::NotFound(_))));
}
