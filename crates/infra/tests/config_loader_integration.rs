//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use costsync_infra::config;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_toml_file() {
    // Create a temporary TOML config file
    let toml_content = r#"
[github]
enterprise = "acme-corp"
token = "ghp_integration"
api_url = "https://github.example.com/api/v3"

[pru]
exception_users = ["alice", "bob"]
no_pru_cost_center_id = "cc-no-pru"
pru_cost_center_id = "cc-pru"

[teams]
scope = "organization"
organizations = ["acme-eng", "acme-research"]
mapping_mode = "manual"

[teams.manual_mappings]
"acme-eng/platform" = "Platform Engineering"

[cache]
enabled = true
path = "/tmp/costsync_cache.json"
ttl_hours = 12

[state]
last_run_path = "/tmp/costsync_last_run"
"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    // Load configuration from the file
    let result = config::load_from_file(Some(path.clone()));
    assert!(result.is_ok(), "Failed to load config from TOML file");

    let config = result.unwrap();

    // Verify connection configuration
    assert_eq!(config.github.enterprise, "acme-corp");
    assert_eq!(config.github.token, "ghp_integration");
    assert_eq!(config.github.api_url, "https://github.example.com/api/v3");

    // Verify PRU configuration
    assert_eq!(config.pru.exception_users, vec!["alice", "bob"]);
    assert_eq!(config.pru.no_pru_cost_center_id, "cc-no-pru");
    assert_eq!(config.pru.pru_cost_center_id, "cc-pru");

    // Verify teams configuration
    assert_eq!(config.teams.organizations, vec!["acme-eng", "acme-research"]);
    assert_eq!(
        config.teams.manual_mappings.get("acme-eng/platform"),
        Some(&"Platform Engineering".to_string())
    );

    // Verify cache and state configuration
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl_hours, 12);
    assert_eq!(config.state.last_run_path.to_string_lossy(), "/tmp/costsync_last_run");

    // Cleanup
    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_json_file() {
    // Create a temporary JSON config file
    let json_content = r#"{
        "github": {
            "enterprise": "acme-corp",
            "token": "ghp_json_integration"
        },
        "teams": {
            "scope": "enterprise",
            "mapping_mode": "auto",
            "name_template": "CC {org}-{team_slug}",
            "full_sync": true
        },
        "cache": {
            "enabled": false
        }
    }"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    // Load configuration from the file
    let result = config::load_from_file(Some(path.clone()));
    assert!(result.is_ok(), "Failed to load config from JSON file");

    let config = result.unwrap();

    assert_eq!(config.github.enterprise, "acme-corp");
    assert_eq!(config.teams.name_template, "CC {org}-{team_slug}");
    assert!(config.teams.full_sync);
    assert!(!config.cache.enabled);

    // Cleanup
    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_with_minimal_fields() {
    // Create a config file with only the connection section
    let json_content = r#"{
        "github": {
            "enterprise": "acme-corp",
            "token": "ghp_minimal"
        }
    }"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    // Load configuration from the file
    let result = config::load_from_file(Some(path.clone()));
    assert!(result.is_ok(), "Failed to load config with minimal fields");

    let config = result.unwrap();

    // Everything outside [github] falls back to defaults
    assert_eq!(config.github.api_url, "https://api.github.com");
    assert_eq!(config.pru.no_pru_cost_center_name, "00 - No PRU overages");
    assert_eq!(config.pru.pru_cost_center_name, "01 - PRU overages allowed");
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl_hours, 24);

    // Cleanup
    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some("/nonexistent/path/costsync.toml".into()));
    assert!(result.is_err(), "Should fail when file doesn't exist");

    match result {
        Err(costsync_domain::CostsyncError::Config(msg)) => {
            assert!(msg.contains("not found"), "Error message should mention 'not found'");
        }
        _ => panic!("Expected Config error"),
    }
}

#[test]
fn test_load_config_with_invalid_format() {
    // Create a file with invalid JSON
    let invalid_content = r#"{ "github": { "enterprise": "#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(invalid_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    // Attempt to load configuration
    let result = config::load_from_file(Some(path.clone()));
    assert!(result.is_err(), "Should fail with invalid JSON");

    match result {
        Err(costsync_domain::CostsyncError::Config(msg)) => {
            assert!(msg.contains("Invalid JSON"), "Error message should mention invalid JSON");
        }
        _ => panic!("Expected Config error"),
    }

    // Cleanup
    std::fs::remove_file(path).ok();
}
