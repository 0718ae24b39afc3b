//! Per-cost-center outcome accounting for a sync run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which users ended up correctly placed and which did not, for a
/// single cost center.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CostCenterOutcome {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeSet<String>,
}

/// Outcome of one sync run, keyed by cost-center display name.
///
/// Every user the run decided on is recorded: batched writes land as
/// successes or failures, and users found already in place count as
/// successes without a write, so a fully converged run still reports
/// its whole roster as succeeded.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    outcomes: BTreeMap<String, CostCenterOutcome>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a cost center appears in the summary even when no write
    /// was needed for it.
    pub fn touch(&mut self, cost_center: &str) {
        self.outcomes.entry(cost_center.to_string()).or_default();
    }

    pub fn record_successes(&mut self, cost_center: &str, logins: &[String]) {
        let outcome = self.outcomes.entry(cost_center.to_string()).or_default();
        outcome.succeeded.extend(logins.iter().cloned());
    }

    pub fn record_failures(&mut self, cost_center: &str, logins: &[String]) {
        let outcome = self.outcomes.entry(cost_center.to_string()).or_default();
        outcome.failed.extend(logins.iter().cloned());
    }

    pub fn merge(&mut self, other: SyncReport) {
        for (cost_center, outcome) in other.outcomes {
            let entry = self.outcomes.entry(cost_center).or_default();
            entry.succeeded.extend(outcome.succeeded);
            entry.failed.extend(outcome.failed);
        }
    }

    pub fn total_succeeded(&self) -> usize {
        self.outcomes.values().map(|o| o.succeeded.len()).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.outcomes.values().map(|o| o.failed.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total_failed() == 0
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &CostCenterOutcome)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    /// Cost centers that saw at least one failed write, with the
    /// affected logins.
    pub fn failed_users(&self) -> BTreeMap<&str, &BTreeSet<String>> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.failed.is_empty())
            .map(|(name, outcome)| (name.as_str(), &outcome.failed))
            .collect()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Sync summary: {} succeeded, {} failed",
            self.total_succeeded(),
            self.total_failed()
        )?;
        for (cost_center, outcome) in &self.outcomes {
            writeln!(
                f,
                "  {}: {} succeeded, {} failed",
                cost_center,
                outcome.succeeded.len(),
                outcome.failed.len()
            )?;
            if !outcome.failed.is_empty() {
                let failed: Vec<&str> = outcome.failed.iter().map(String::as_str).collect();
                writeln!(f, "    failed: {}", failed.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logins(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn totals_sum_across_cost_centers() {
        let mut report = SyncReport::new();
        report.record_successes("A", &logins(&["alice", "bob"]));
        report.record_successes("B", &logins(&["carol"]));
        report.record_failures("B", &logins(&["dave"]));

        assert_eq!(report.total_succeeded(), 3);
        assert_eq!(report.total_failed(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn failed_users_lists_only_cost_centers_with_failures() {
        let mut report = SyncReport::new();
        report.record_successes("A", &logins(&["alice"]));
        report.record_failures("B", &logins(&["bob", "carol"]));

        let failed = report.failed_users();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed["B"].len(), 2);
    }

    #[test]
    fn merge_folds_outcomes_together() {
        let mut first = SyncReport::new();
        first.record_successes("A", &logins(&["alice"]));

        let mut second = SyncReport::new();
        second.record_successes("A", &logins(&["bob"]));
        second.record_failures("C", &logins(&["erin"]));

        first.merge(second);
        assert_eq!(first.total_succeeded(), 2);
        assert_eq!(first.failed_users()["C"].len(), 1);
    }

    #[test]
    fn touched_cost_center_appears_with_zero_counts() {
        let mut report = SyncReport::new();
        report.touch("Quiet");

        let rendered = report.to_string();
        assert!(rendered.contains("Quiet: 0 succeeded, 0 failed"));
    }

    #[test]
    fn duplicate_records_are_counted_once() {
        let mut report = SyncReport::new();
        report.record_successes("A", &logins(&["alice"]));
        report.record_successes("A", &logins(&["alice"]));

        assert_eq!(report.total_succeeded(), 1);
    }

    #[test]
    fn display_lists_failed_logins() {
        let mut report = SyncReport::new();
        report.record_successes("A", &logins(&["alice"]));
        report.record_failures("A", &logins(&["bob"]));

        let rendered = report.to_string();
        assert!(rendered.starts_with("Sync summary: 1 succeeded, 1 failed"));
        assert!(rendered.contains("failed: bob"));
    }
}
