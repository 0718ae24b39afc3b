//! Configuration loader
//!
//! Loads application configuration from files with environment variable
//! overrides.
//!
//! ## Loading Strategy
//! 1. `COSTSYNC_CONFIG` names an explicit file, which must exist
//! 2. Otherwise, probes multiple paths for config files
//! 3. If no file is found, starts from defaults
//! 4. Environment overrides are applied on top of the file values
//!
//! ## Environment Variables
//! - `COSTSYNC_CONFIG`: Explicit config file path
//! - `GITHUB_TOKEN`: API token, takes precedence over `github.token`
//! - `COSTSYNC_ENTERPRISE`: Enterprise slug, takes precedence over
//!   `github.enterprise`
//! - `COSTSYNC_API_URL`: API base URL, takes precedence over
//!   `github.api_url`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./costsync.toml` or `./costsync.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. `../costsync.{toml,json}` and `../../costsync.{toml,json}`
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use costsync_domain::{Config, CostsyncError, Result};

/// Load configuration with automatic fallback strategy
///
/// Reads the explicitly named file if given, then the file named by
/// `COSTSYNC_CONFIG`, otherwise probes the standard locations. A
/// missing file (when none was explicitly named) is not an error; the
/// defaults are used. Environment overrides are applied last, so
/// `GITHUB_TOKEN` et al. always win over file values.
///
/// # Errors
/// Returns `CostsyncError::Config` if:
/// - The explicit path (argument or `COSTSYNC_CONFIG`) does not exist
/// - File format is invalid
pub fn load(explicit: Option<PathBuf>) -> Result<Config> {
    let path = explicit.or_else(|| env_var("COSTSYNC_CONFIG").map(PathBuf::from));
    let mut config = load_from_file(path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files and
/// falls back to [`Config::default`] when none exists. Supports both
/// TOML and JSON formats (detected by file extension).
///
/// Environment overrides are NOT applied here; use [`load`] for the
/// full strategy.
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `CostsyncError::Config` if:
/// - File not found (when path is specified)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CostsyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => match probe_config_paths() {
            Some(found) => found,
            None => {
                tracing::debug!("No config file found in any of the standard locations");
                return Ok(Config::default());
            }
        },
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CostsyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.toml` or `.json`).
///
/// # Errors
/// Returns `CostsyncError::Config` if format is invalid or parsing
/// fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CostsyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CostsyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CostsyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./costsync.{toml,json}`,
///    `./config.{toml,json}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("costsync.toml"),
            cwd.join("costsync.json"),
            cwd.join("config.toml"),
            cwd.join("config.json"),
            cwd.join("../costsync.toml"),
            cwd.join("../costsync.json"),
            cwd.join("../../costsync.toml"),
            cwd.join("../../costsync.json"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("costsync.toml"),
                exe_dir.join("costsync.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("config.json"),
            ]);
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

/// Overlay environment variables onto a loaded configuration.
fn apply_env_overrides(config: &mut Config) {
    if let Some(token) = env_var("GITHUB_TOKEN") {
        config.github.token = token;
    }
    if let Some(enterprise) = env_var("COSTSYNC_ENTERPRISE") {
        config.github.enterprise = enterprise;
    }
    if let Some(api_url) = env_var("COSTSYNC_API_URL") {
        config.github.api_url = api_url;
    }
}

/// Get an environment variable, treating blank values as unset.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
