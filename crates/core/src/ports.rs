//! Port interfaces for the reconciliation engine
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use costsync_domain::{
    Budget, CopilotUser, CostCenter, CostCenterMembership, Result, Team, TeamScope,
};

/// Read/write surface of the enterprise billing API.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Full Copilot seat roster for the enterprise, deduplicated by
    /// login.
    async fn copilot_users(&self) -> Result<Vec<CopilotUser>>;

    /// Teams visible in the given scope.
    async fn teams(&self, scope: &TeamScope) -> Result<Vec<Team>>;

    /// Member logins of one team.
    async fn team_members(&self, team: &Team) -> Result<Vec<String>>;

    /// All cost centers, in any lifecycle state.
    async fn cost_centers(&self) -> Result<Vec<CostCenter>>;

    /// Create a cost center and return its identifier. An
    /// already-exists response surfaces as [`CostsyncError::Conflict`]
    /// carrying the server's message.
    ///
    /// [`CostsyncError::Conflict`]: costsync_domain::CostsyncError::Conflict
    async fn create_cost_center(&self, name: &str) -> Result<String>;

    /// Current member logins of a cost center.
    async fn cost_center_members(&self, cost_center_id: &str) -> Result<Vec<String>>;

    /// Add up to 50 logins to a cost center. The call succeeds or fails
    /// as a unit.
    async fn add_users(&self, cost_center_id: &str, users: &[String]) -> Result<()>;

    /// Remove up to 50 logins from a cost center.
    async fn remove_users(&self, cost_center_id: &str, users: &[String]) -> Result<()>;

    /// The cost center a single user currently occupies, if any.
    async fn user_membership(&self, login: &str) -> Result<Option<CostCenterMembership>>;

    /// All budgets. A 404 surfaces as
    /// [`CostsyncError::BudgetsUnavailable`].
    ///
    /// [`CostsyncError::BudgetsUnavailable`]: costsync_domain::CostsyncError::BudgetsUnavailable
    async fn budgets(&self) -> Result<Vec<Budget>>;

    /// Create a zero-amount, usage-preventing budget scoped to the cost
    /// center. A 404 surfaces as `BudgetsUnavailable`.
    async fn create_budget(&self, cost_center_id: &str) -> Result<()>;
}

/// Cost-center name to identifier cache consulted before remote
/// resolution. Implementations decide persistence and expiry; an
/// expired or disabled cache simply reports misses.
pub trait MappingCache: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// Store a resolution. Best-effort: failures are logged by the
    /// implementation, never surfaced to callers.
    fn set(&self, name: &str, id: &str);
}

/// A cache that never hits, for runs with caching disabled and for
/// tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl MappingCache for NoopCache {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }

    fn set(&self, _name: &str, _id: &str) {}
}
