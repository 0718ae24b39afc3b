//! Reconciliation engine
//!
//! Diffs desired cost-center membership against live membership and
//! issues the minimal set of writes. Writes are batched at the API
//! limit; a failed batch marks exactly its users as failed and the run
//! moves on, so one bad cost center cannot sink the rest.
//!
//! The default mode verifies each candidate's current membership
//! before adding: a user already in the target counts as done, a user
//! in a different cost center is left where they are and reported as
//! failed. Fast mode skips the checks and lets the add endpoint move
//! users wholesale.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use costsync_domain::DesiredState;
use tracing::{debug, info, warn};

use crate::ports::BillingApi;
use crate::report::SyncReport;

/// The membership write endpoints accept at most this many users per
/// request.
pub const MAX_USERS_PER_CALL: usize = 50;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Skip the per-user membership verification before adding. Saves
    /// one API call per user, but users that belong to a different
    /// cost center get moved instead of skipped.
    pub fast: bool,
    /// Remove live members that are absent from the desired state.
    pub remove_orphans: bool,
}

/// A cost center resolved to its billing id, with the users it should
/// hold after the run.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub cost_center_id: String,
    pub display_name: String,
    pub users: Vec<String>,
}

/// One cost center's intended membership in a plan.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub cost_center: String,
    pub users: Vec<String>,
}

/// The assignments an apply run would converge towards, computed
/// without touching the API.
#[derive(Debug, Default)]
pub struct PlanReport {
    pub entries: Vec<PlanEntry>,
}

impl PlanReport {
    pub fn cost_center_count(&self) -> usize {
        self.entries.len()
    }

    pub fn user_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.users.len()).sum()
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Plan: {} cost center(s), {} user(s)",
            self.cost_center_count(),
            self.user_count()
        )?;
        for entry in &self.entries {
            let users: Vec<&str> = entry.users.iter().map(String::as_str).collect();
            writeln!(f, "  {} ({}): {}", entry.cost_center, entry.users.len(), users.join(", "))?;
        }
        Ok(())
    }
}

/// Converges live cost-center membership towards a desired state.
pub struct Reconciler {
    api: Arc<dyn BillingApi>,
}

impl Reconciler {
    pub fn new(api: Arc<dyn BillingApi>) -> Self {
        Self { api }
    }

    /// Summarize the desired state as the writes an apply would aim
    /// for. Plans never call the API.
    pub fn plan(desired: &DesiredState) -> PlanReport {
        let entries = desired
            .iter()
            .map(|(cost_center, users)| PlanEntry {
                cost_center: cost_center.clone(),
                users: users.iter().cloned().collect(),
            })
            .collect();
        PlanReport { entries }
    }

    /// Reconcile every target against its live membership. Failures
    /// are recorded per user and never abort the run.
    pub async fn apply(&self, targets: &[SyncTarget], options: SyncOptions) -> SyncReport {
        let mut report = SyncReport::new();
        for target in targets {
            self.apply_target(target, options, &mut report).await;
        }
        info!(
            succeeded = report.total_succeeded(),
            failed = report.total_failed(),
            "reconciliation complete"
        );
        report
    }

    async fn apply_target(
        &self,
        target: &SyncTarget,
        options: SyncOptions,
        report: &mut SyncReport,
    ) {
        report.touch(&target.display_name);

        let live: BTreeSet<String> =
            match self.api.cost_center_members(&target.cost_center_id).await {
                Ok(members) => members.into_iter().collect(),
                Err(err) => {
                    warn!(
                        cost_center = %target.display_name,
                        error = %err,
                        "failed to list live members; assuming empty"
                    );
                    BTreeSet::new()
                }
            };
        let desired: BTreeSet<String> = target.users.iter().cloned().collect();

        let already_placed: Vec<String> = desired.intersection(&live).cloned().collect();
        if !already_placed.is_empty() {
            debug!(
                cost_center = %target.display_name,
                count = already_placed.len(),
                "users already in place"
            );
            report.record_successes(&target.display_name, &already_placed);
        }

        let mut to_add: Vec<String> = desired.difference(&live).cloned().collect();
        if !options.fast {
            to_add = self.verified_candidates(target, to_add, report).await;
        }

        if to_add.is_empty() {
            debug!(cost_center = %target.display_name, "membership already converged");
        } else {
            info!(
                cost_center = %target.display_name,
                adds = to_add.len(),
                "adding users"
            );
        }
        for chunk in to_add.chunks(MAX_USERS_PER_CALL) {
            match self.api.add_users(&target.cost_center_id, chunk).await {
                Ok(()) => {
                    debug!(cost_center = %target.display_name, batch = chunk.len(), "batch added");
                    report.record_successes(&target.display_name, chunk);
                }
                Err(err) => {
                    warn!(
                        cost_center = %target.display_name,
                        batch = chunk.len(),
                        error = %err,
                        "failed to add batch"
                    );
                    report.record_failures(&target.display_name, chunk);
                }
            }
        }

        if options.remove_orphans {
            let to_remove: Vec<String> = live.difference(&desired).cloned().collect();
            if !to_remove.is_empty() {
                info!(
                    cost_center = %target.display_name,
                    removals = to_remove.len(),
                    "removing users no longer in the desired state"
                );
            }
            for chunk in to_remove.chunks(MAX_USERS_PER_CALL) {
                match self.api.remove_users(&target.cost_center_id, chunk).await {
                    Ok(()) => report.record_successes(&target.display_name, chunk),
                    Err(err) => {
                        warn!(
                            cost_center = %target.display_name,
                            batch = chunk.len(),
                            error = %err,
                            "failed to remove batch"
                        );
                        report.record_failures(&target.display_name, chunk);
                    }
                }
            }
        }
    }

    /// Check each candidate against the single-user membership
    /// endpoint. A candidate already in the target is recorded as
    /// succeeded without a write; one that belongs to a different cost
    /// center is recorded as failed and left alone. A failed check
    /// keeps the candidate in the batch.
    async fn verified_candidates(
        &self,
        target: &SyncTarget,
        candidates: Vec<String>,
        report: &mut SyncReport,
    ) -> Vec<String> {
        let mut kept = Vec::with_capacity(candidates.len());
        for login in candidates {
            match self.api.user_membership(&login).await {
                Ok(Some(membership)) if membership.cost_center_id == target.cost_center_id => {
                    debug!(
                        user = %login,
                        cost_center = %target.display_name,
                        "already in the desired cost center"
                    );
                    report.record_successes(&target.display_name, std::slice::from_ref(&login));
                }
                Ok(Some(membership)) => {
                    warn!(
                        user = %login,
                        current = %membership.cost_center_name,
                        desired = %target.display_name,
                        "user belongs to another cost center; not moving (use --fast to force)"
                    );
                    report.record_failures(&target.display_name, std::slice::from_ref(&login));
                }
                Ok(None) => kept.push(login),
                Err(err) => {
                    warn!(
                        user = %login,
                        error = %err,
                        "membership check failed; keeping user in batch"
                    );
                    kept.push(login);
                }
            }
        }
        kept
    }
}
