//! Shared in-memory `BillingApi` double for engine unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use costsync_domain::{
    Budget, CopilotUser, CostCenter, CostCenterMembership, CostsyncError, Result, Team, TeamScope,
};

use crate::ports::BillingApi;

/// A write issued against the mock, for asserting call behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateCostCenter { name: String },
    AddUsers { cost_center_id: String, users: Vec<String> },
    RemoveUsers { cost_center_id: String, users: Vec<String> },
    CreateBudget { cost_center_id: String },
}

#[derive(Default)]
pub struct MockBillingApi {
    pub users: Vec<CopilotUser>,
    pub teams: Vec<Team>,
    /// Team mapping key to member logins.
    pub team_members: BTreeMap<String, Vec<String>>,
    /// Team mapping keys whose member fetch fails.
    pub fail_members_for: BTreeSet<String>,
    pub cost_centers: Mutex<Vec<CostCenter>>,
    /// Cost center id to live member logins.
    pub members: Mutex<BTreeMap<String, BTreeSet<String>>>,
    /// Login to current cost center, for the single-user check.
    pub memberships: BTreeMap<String, CostCenterMembership>,
    pub budgets: Mutex<Vec<Budget>>,
    /// Simulate an enterprise without the budgets feature.
    pub budgets_unavailable: bool,
    /// Conflict body returned instead of creating, keyed by name.
    pub conflicts: BTreeMap<String, String>,
    /// Cost center ids whose add_users calls fail.
    pub fail_add_for: BTreeSet<String>,
    /// Cost center ids whose member listing fails.
    pub fail_list_members_for: BTreeSet<String>,
    /// Logins whose single-user membership check fails.
    pub fail_membership_for: BTreeSet<String>,
    pub calls: Mutex<Vec<ApiCall>>,
}

impl MockBillingApi {
    pub fn recorded_calls(&self) -> Vec<ApiCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub fn live_members(&self, cost_center_id: &str) -> BTreeSet<String> {
        self.members
            .lock()
            .expect("members mutex")
            .get(cost_center_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().expect("calls mutex").push(call);
    }
}

#[async_trait]
impl BillingApi for MockBillingApi {
    async fn copilot_users(&self) -> Result<Vec<CopilotUser>> {
        Ok(self.users.clone())
    }

    async fn teams(&self, scope: &TeamScope) -> Result<Vec<Team>> {
        Ok(self.teams.iter().filter(|team| &team.scope == scope).cloned().collect())
    }

    async fn team_members(&self, team: &Team) -> Result<Vec<String>> {
        let key = team.mapping_key();
        if self.fail_members_for.contains(&key) {
            return Err(CostsyncError::Network(format!("members fetch failed for {key}")));
        }
        Ok(self.team_members.get(&key).cloned().unwrap_or_default())
    }

    async fn cost_centers(&self) -> Result<Vec<CostCenter>> {
        Ok(self.cost_centers.lock().expect("cost centers mutex").clone())
    }

    async fn create_cost_center(&self, name: &str) -> Result<String> {
        self.record(ApiCall::CreateCostCenter { name: name.to_string() });
        if let Some(message) = self.conflicts.get(name) {
            return Err(CostsyncError::Conflict(message.clone()));
        }
        let id = format!("id-{}", name.to_lowercase().replace(' ', "-"));
        self.cost_centers.lock().expect("cost centers mutex").push(CostCenter {
            id: id.clone(),
            name: name.to_string(),
            state: "active".to_string(),
        });
        Ok(id)
    }

    async fn cost_center_members(&self, cost_center_id: &str) -> Result<Vec<String>> {
        if self.fail_list_members_for.contains(cost_center_id) {
            return Err(CostsyncError::Api(format!(
                "member listing failed for {cost_center_id}"
            )));
        }
        Ok(self.live_members(cost_center_id).into_iter().collect())
    }

    async fn add_users(&self, cost_center_id: &str, users: &[String]) -> Result<()> {
        self.record(ApiCall::AddUsers {
            cost_center_id: cost_center_id.to_string(),
            users: users.to_vec(),
        });
        if self.fail_add_for.contains(cost_center_id) {
            return Err(CostsyncError::Api(format!("add rejected for {cost_center_id}")));
        }
        let mut members = self.members.lock().expect("members mutex");
        let entry = members.entry(cost_center_id.to_string()).or_default();
        entry.extend(users.iter().cloned());
        Ok(())
    }

    async fn remove_users(&self, cost_center_id: &str, users: &[String]) -> Result<()> {
        self.record(ApiCall::RemoveUsers {
            cost_center_id: cost_center_id.to_string(),
            users: users.to_vec(),
        });
        let mut members = self.members.lock().expect("members mutex");
        if let Some(entry) = members.get_mut(cost_center_id) {
            for login in users {
                entry.remove(login);
            }
        }
        Ok(())
    }

    async fn user_membership(&self, login: &str) -> Result<Option<CostCenterMembership>> {
        if self.fail_membership_for.contains(login) {
            return Err(CostsyncError::Network(format!("membership check failed for {login}")));
        }
        Ok(self.memberships.get(login).cloned())
    }

    async fn budgets(&self) -> Result<Vec<Budget>> {
        if self.budgets_unavailable {
            return Err(CostsyncError::BudgetsUnavailable(
                "budgets endpoint answered 404".to_string(),
            ));
        }
        Ok(self.budgets.lock().expect("budgets mutex").clone())
    }

    async fn create_budget(&self, cost_center_id: &str) -> Result<()> {
        self.record(ApiCall::CreateBudget { cost_center_id: cost_center_id.to_string() });
        if self.budgets_unavailable {
            return Err(CostsyncError::BudgetsUnavailable(
                "budgets endpoint answered 404".to_string(),
            ));
        }
        // The live API stores the cost center NAME as the entity name
        // even when an id was submitted; the mock mirrors that quirk.
        let name = self
            .cost_centers
            .lock()
            .expect("cost centers mutex")
            .iter()
            .find(|cc| cc.id == cost_center_id)
            .map_or_else(|| cost_center_id.to_string(), |cc| cc.name.clone());
        self.budgets.lock().expect("budgets mutex").push(Budget {
            budget_scope: "cost_center".to_string(),
            budget_entity_name: name,
        });
        Ok(())
    }
}
