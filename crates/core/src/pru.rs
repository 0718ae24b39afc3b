//! PRU exception-list assignment
//!
//! The static two-tier rule: logins on the exception list may consume
//! premium request overages and land in the "overages allowed" cost
//! center; everyone else lands in the default one.

use std::collections::{BTreeMap, BTreeSet};

use costsync_domain::{CopilotUser, PruConfig};

/// Resolves every user to one of the two PRU cost centers.
///
/// Pure; no I/O. The decision depends only on the user's login and the
/// configured exception set.
pub struct PruResolver {
    exceptions: BTreeSet<String>,
    no_pru_id: String,
    pru_allowed_id: String,
}

impl PruResolver {
    pub fn new(config: &PruConfig) -> Self {
        Self {
            exceptions: config.exception_users.iter().cloned().collect(),
            no_pru_id: config.no_pru_cost_center_id.clone(),
            pru_allowed_id: config.pru_cost_center_id.clone(),
        }
    }

    /// Override the target identifiers, for runs that provisioned the
    /// pair by name instead of configuring identifiers up front.
    pub fn with_targets(
        mut self,
        no_pru_id: impl Into<String>,
        pru_allowed_id: impl Into<String>,
    ) -> Self {
        self.no_pru_id = no_pru_id.into();
        self.pru_allowed_id = pru_allowed_id.into();
        self
    }

    /// Cost center identifier for one user.
    pub fn assign(&self, user: &CopilotUser) -> &str {
        if self.exceptions.contains(&user.login) {
            &self.pru_allowed_id
        } else {
            &self.no_pru_id
        }
    }

    /// Attach the derived assignment to every user in place.
    pub fn assign_all(&self, users: &mut [CopilotUser]) {
        for user in users.iter_mut() {
            user.cost_center = Some(self.assign(user).to_string());
        }
    }

    /// User count per target cost center, for the pre-apply summary.
    pub fn summarize(&self, users: &[CopilotUser]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        counts.insert(self.no_pru_id.clone(), 0usize);
        counts.insert(self.pru_allowed_id.clone(), 0usize);
        for user in users {
            let target = self.assign(user).to_string();
            *counts.entry(target).or_insert(0) += 1;
        }
        counts
    }

    pub fn no_pru_id(&self) -> &str {
        &self.no_pru_id
    }

    pub fn pru_allowed_id(&self) -> &str {
        &self.pru_allowed_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PruResolver {
        PruResolver::new(&PruConfig {
            exception_users: vec!["alice".to_string()],
            no_pru_cost_center_id: "cc-no-pru".to_string(),
            pru_cost_center_id: "cc-pru-allowed".to_string(),
            ..PruConfig::default()
        })
    }

    #[test]
    fn exception_users_get_the_overages_cost_center() {
        let resolver = resolver();
        assert_eq!(resolver.assign(&CopilotUser::new("alice")), "cc-pru-allowed");
        assert_eq!(resolver.assign(&CopilotUser::new("bob")), "cc-no-pru");
    }

    #[test]
    fn assign_all_attaches_a_cost_center_to_every_user() {
        let resolver = resolver();
        let mut users = vec![CopilotUser::new("alice"), CopilotUser::new("bob")];
        resolver.assign_all(&mut users);

        assert_eq!(users[0].cost_center.as_deref(), Some("cc-pru-allowed"));
        assert_eq!(users[1].cost_center.as_deref(), Some("cc-no-pru"));
    }

    #[test]
    fn summary_counts_one_user_per_bucket() {
        let resolver = resolver();
        let users = vec![CopilotUser::new("alice"), CopilotUser::new("bob")];

        let summary = resolver.summarize(&users);
        assert_eq!(summary.get("cc-pru-allowed"), Some(&1));
        assert_eq!(summary.get("cc-no-pru"), Some(&1));
    }

    #[test]
    fn summary_includes_empty_buckets() {
        let resolver = resolver();
        let summary = resolver.summarize(&[]);
        assert_eq!(summary.get("cc-pru-allowed"), Some(&0));
        assert_eq!(summary.get("cc-no-pru"), Some(&0));
    }
}
