//! Core data types for the reconciliation engine

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Copilot license holder, sourced from the enterprise seat roster.
///
/// The `cost_center` field is derived during a run and never persisted;
/// it is recomputed from scratch every time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
}

impl CopilotUser {
    /// Minimal user with only a login, for construction in resolvers
    /// and tests.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            name: None,
            email: None,
            user_type: None,
            created_at: None,
            last_activity_at: None,
            cost_center: None,
        }
    }
}

/// Enumeration boundary for team listing: a single organization or the
/// whole enterprise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamScope {
    Organization(String),
    Enterprise,
}

impl TeamScope {
    /// Label used in logs and mapping keys.
    pub fn label(&self) -> &str {
        match self {
            Self::Organization(org) => org.as_str(),
            Self::Enterprise => "enterprise",
        }
    }
}

/// A team within an organization or the enterprise. Read-only from this
/// system's perspective; fetched fresh each run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub slug: String,
    pub name: String,
    pub scope: TeamScope,
}

impl Team {
    /// Key used for manual mapping lookups: `org/slug` for organization
    /// teams, the bare slug for enterprise teams.
    pub fn mapping_key(&self) -> String {
        match &self.scope {
            TeamScope::Organization(org) => format!("{}/{}", org, self.slug),
            TeamScope::Enterprise => self.slug.clone(),
        }
    }
}

/// A cost center as listed by the billing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
}

impl CostCenter {
    /// Only active cost centers can receive assignments; deleted ones
    /// linger in listings with a different state.
    pub fn is_active(&self) -> bool {
        self.state.eq_ignore_ascii_case("active")
    }
}

/// The cost center a user currently occupies, from the single-user
/// membership lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostCenterMembership {
    pub cost_center_id: String,
    pub cost_center_name: String,
}

/// A budget attached to a billing entity, as listed by the budgets API.
///
/// Matching is by `budget_entity_name` against the cost center *name*:
/// the API stores the name there even when an identifier was submitted
/// at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub budget_scope: String,
    #[serde(default)]
    pub budget_entity_name: String,
}

/// Desired cost-center membership for one run: cost-center name or
/// identifier mapped to the set of logins that should end up there.
///
/// Invariant: the sets partition the processed user population. No login
/// appears under two cost centers within one run.
pub type DesiredState = BTreeMap<String, BTreeSet<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_key_qualifies_org_teams() {
        let team = Team {
            slug: "platform".to_string(),
            name: "Platform".to_string(),
            scope: TeamScope::Organization("acme".to_string()),
        };
        assert_eq!(team.mapping_key(), "acme/platform");
    }

    #[test]
    fn mapping_key_uses_bare_slug_for_enterprise_teams() {
        let team = Team {
            slug: "platform".to_string(),
            name: "Platform".to_string(),
            scope: TeamScope::Enterprise,
        };
        assert_eq!(team.mapping_key(), "platform");
    }

    #[test]
    fn cost_center_state_check_is_case_insensitive() {
        let mut cc = CostCenter {
            id: "abc".to_string(),
            name: "Engineering".to_string(),
            state: "Active".to_string(),
        };
        assert!(cc.is_active());

        cc.state = "deleted".to_string();
        assert!(!cc.is_active());

        cc.state = String::new();
        assert!(!cc.is_active());
    }

    #[test]
    fn copilot_user_deserializes_with_missing_optional_fields() {
        let user: CopilotUser =
            serde_json::from_str(r#"{"login": "octocat"}"#).expect("minimal user");
        assert_eq!(user.login, "octocat");
        assert!(user.name.is_none());
        assert!(user.created_at.is_none());
    }
}
