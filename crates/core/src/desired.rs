//! Desired-state construction
//!
//! Both assignment modes funnel through here: resolver output becomes a
//! [`DesiredState`] mapping each cost center to a deduplicated username
//! set. The partition invariant (every considered user in exactly one
//! group) holds by construction because each user carries exactly one
//! assignment into these transforms.

use std::collections::{BTreeMap, BTreeSet};

use costsync_domain::{CopilotUser, DesiredState};

use crate::teams::TeamAssignment;

/// Group users by their derived cost center.
///
/// Users without an assignment are ignored; the PRU resolver always
/// sets one before this is called.
pub fn from_users(users: &[CopilotUser]) -> DesiredState {
    let mut state = DesiredState::new();
    for user in users {
        if let Some(cost_center) = &user.cost_center {
            state.entry(cost_center.clone()).or_default().insert(user.login.clone());
        }
    }
    state
}

/// Flatten teams-resolver output to unique usernames per cost center.
pub fn from_team_assignments(
    resolved: &BTreeMap<String, Vec<TeamAssignment>>,
) -> DesiredState {
    let mut state = DesiredState::new();
    for (cost_center, assignments) in resolved {
        let logins: BTreeSet<String> =
            assignments.iter().map(|assignment| assignment.login.clone()).collect();
        if !logins.is_empty() {
            state.insert(cost_center.clone(), logins);
        }
    }
    state
}

/// Number of distinct usernames across all groups.
pub fn distinct_users(state: &DesiredState) -> usize {
    state.values().flatten().collect::<BTreeSet<_>>().len()
}
