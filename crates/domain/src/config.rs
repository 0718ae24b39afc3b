//! Configuration structures
//!
//! Deserialized from TOML or JSON by the infra loader; validated here
//! before any remote call is made. Every section has serde defaults so a
//! partial file (or none at all, with environment overrides) still
//! produces a usable configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{CostsyncError, Result};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub pru: PruConfig,
    pub teams: TeamsConfig,
    pub cache: CacheConfig,
    pub state: StateConfig,
}

/// Connection settings for the GitHub Enterprise Billing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Enterprise slug, e.g. `acme-corp`.
    pub enterprise: String,
    /// Personal access token. The `GITHUB_TOKEN` environment variable
    /// takes precedence over this field.
    pub token: String,
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self { enterprise: String::new(), token: String::new(), api_url: default_api_url() }
    }
}

/// Settings for the PRU exception-list assignment rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruConfig {
    /// Logins allowed to consume premium request overages.
    pub exception_users: Vec<String>,
    /// Target cost center for everyone else.
    pub no_pru_cost_center_id: String,
    /// Target cost center for exception-list members.
    pub pru_cost_center_id: String,
    /// Display names used when the cost centers are provisioned by this
    /// tool rather than configured by identifier.
    pub no_pru_cost_center_name: String,
    pub pru_cost_center_name: String,
}

impl Default for PruConfig {
    fn default() -> Self {
        Self {
            exception_users: Vec::new(),
            no_pru_cost_center_id: String::new(),
            pru_cost_center_id: String::new(),
            no_pru_cost_center_name: default_no_pru_name(),
            pru_cost_center_name: default_pru_name(),
        }
    }
}

/// Team enumeration boundary for teams mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    #[default]
    Organization,
    Enterprise,
}

/// How a team's cost-center name is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// Exact lookup in `manual_mappings`; unmapped teams are skipped.
    #[default]
    Manual,
    /// Render `name_template` with the team's fields.
    Auto,
}

/// Settings for teams-mode assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamsConfig {
    pub scope: ScopeKind,
    /// Organizations to enumerate when `scope = "organization"`.
    pub organizations: Vec<String>,
    pub mapping_mode: MappingMode,
    /// `org/slug` (or bare slug for enterprise teams) to cost-center
    /// name.
    pub manual_mappings: BTreeMap<String, String>,
    /// Template for auto mode; `{team_name}`, `{team_slug}` and `{org}`
    /// are substituted.
    pub name_template: String,
    /// Create missing cost centers during sync.
    pub auto_create: bool,
    /// Remove live members absent from the desired state.
    pub full_sync: bool,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            scope: ScopeKind::default(),
            organizations: Vec::new(),
            mapping_mode: MappingMode::default(),
            manual_mappings: BTreeMap::new(),
            name_template: default_name_template(),
            auto_create: false,
            full_sync: false,
        }
    }
}

/// Settings for the on-disk cost-center mapping cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, path: default_cache_path(), ttl_hours: 24 }
    }
}

/// Settings for run-state persistence (incremental mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub last_run_path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { last_run_path: default_last_run_path() }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_no_pru_name() -> String {
    "00 - No PRU overages".to_string()
}

fn default_pru_name() -> String {
    "01 - PRU overages allowed".to_string()
}

fn default_name_template() -> String {
    "Team: {team_name}".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".cache/cost_centers.json")
}

fn default_last_run_path() -> PathBuf {
    PathBuf::from(".cache/last_run")
}

impl Config {
    /// Base validation required by every command that talks to the API.
    pub fn validate(&self) -> Result<()> {
        if self.github.enterprise.trim().is_empty() {
            return Err(CostsyncError::Config(
                "github.enterprise is required (or set COSTSYNC_ENTERPRISE)".to_string(),
            ));
        }
        if self.github.token.trim().is_empty() {
            return Err(CostsyncError::Config(
                "github.token is required (or set GITHUB_TOKEN)".to_string(),
            ));
        }
        if self.github.api_url.trim().is_empty() {
            return Err(CostsyncError::Config("github.api_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Validation for PRU-mode runs that rely on preconfigured
    /// identifiers. Not required when the run provisions the pair by
    /// name first.
    pub fn validate_pru(&self) -> Result<()> {
        let no_pru = self.pru.no_pru_cost_center_id.trim();
        let pru = self.pru.pru_cost_center_id.trim();
        if no_pru.is_empty() || pru.is_empty() {
            return Err(CostsyncError::Config(
                "pru.no_pru_cost_center_id and pru.pru_cost_center_id are required \
                 (or run with --create-missing)"
                    .to_string(),
            ));
        }
        if no_pru == pru {
            return Err(CostsyncError::Config(
                "pru cost center identifiers must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Validation for teams-mode runs.
    pub fn validate_teams(&self) -> Result<()> {
        if self.teams.scope == ScopeKind::Organization && self.teams.organizations.is_empty() {
            return Err(CostsyncError::Config(
                "teams.organizations is required when teams.scope = \"organization\"".to_string(),
            ));
        }
        if self.teams.mapping_mode == MappingMode::Manual && self.teams.manual_mappings.is_empty()
        {
            return Err(CostsyncError::Config(
                "teams.manual_mappings is empty; add entries or set teams.mapping_mode = \"auto\""
                    .to_string(),
            ));
        }
        if self.teams.mapping_mode == MappingMode::Auto
            && self.teams.name_template.trim().is_empty()
        {
            return Err(CostsyncError::Config("teams.name_template must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.github.enterprise = "acme".to_string();
        config.github.token = "ghp_test".to_string();
        config
    }

    #[test]
    fn validate_rejects_missing_enterprise() {
        let mut config = valid_config();
        config.github.enterprise.clear();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, CostsyncError::Config(_)));
    }

    #[test]
    fn validate_rejects_missing_token() {
        let mut config = valid_config();
        config.github.token = "  ".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_pru_rejects_identical_identifiers() {
        let mut config = valid_config();
        config.pru.no_pru_cost_center_id = "same-id".to_string();
        config.pru.pru_cost_center_id = "same-id".to_string();

        let err = config.validate_pru().unwrap_err();
        assert!(matches!(err, CostsyncError::Config(_)));
    }

    #[test]
    fn validate_pru_accepts_distinct_identifiers() {
        let mut config = valid_config();
        config.pru.no_pru_cost_center_id = "id-a".to_string();
        config.pru.pru_cost_center_id = "id-b".to_string();

        assert!(config.validate_pru().is_ok());
    }

    #[test]
    fn validate_teams_requires_organizations_for_org_scope() {
        let mut config = valid_config();
        config.teams.mapping_mode = MappingMode::Auto;

        let err = config.validate_teams().unwrap_err();
        assert!(matches!(err, CostsyncError::Config(_)));

        config.teams.organizations.push("acme-eng".to_string());
        assert!(config.validate_teams().is_ok());
    }

    #[test]
    fn validate_teams_requires_mappings_in_manual_mode() {
        let mut config = valid_config();
        config.teams.scope = ScopeKind::Enterprise;

        assert!(config.validate_teams().is_err());

        config
            .teams
            .manual_mappings
            .insert("platform".to_string(), "Platform Engineering".to_string());
        assert!(config.validate_teams().is_ok());
    }

    #[test]
    fn scope_and_mapping_mode_parse_from_lowercase() {
        let parsed: TeamsConfig =
            serde_json::from_str(r#"{"scope": "enterprise", "mapping_mode": "auto"}"#)
                .expect("teams config");
        assert_eq!(parsed.scope, ScopeKind::Enterprise);
        assert_eq!(parsed.mapping_mode, MappingMode::Auto);
    }

    #[test]
    fn defaults_cover_provisioning_names_and_cache() {
        let config = Config::default();
        assert_eq!(config.pru.no_pru_cost_center_name, "00 - No PRU overages");
        assert_eq!(config.pru.pru_cost_center_name, "01 - PRU overages allowed");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_hours, 24);
    }
}
