//! Reconciliation command
//!
//! Builds the desired state from the selected assignment mode, prints
//! the plan, and in apply mode (after confirmation) converges live
//! membership towards it. Cost-center names resolve to billing ids
//! only after the operator confirms, so `--create-missing` never
//! creates anything during a plan.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead};

use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use costsync_core::{
    desired, Provisioner, PruResolver, Reconciler, SyncOptions, SyncReport, SyncTarget,
    TeamResolver,
};
use costsync_domain::{CopilotUser, CostsyncError, DesiredState, Result};
use costsync_infra::RunState;
use tracing::{info, warn};

use crate::commands::emit;
use crate::commands::provision::ensure_budgets;
use crate::context::AppContext;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Show what would change without writing
    Plan,
    /// Converge live membership
    Apply,
}

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// plan shows the would-be assignments; apply writes them
    #[arg(long, value_enum, default_value = "plan")]
    pub mode: Mode,

    /// Skip the typed confirmation before applying
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Derive assignments from team membership instead of the PRU rule
    #[arg(long)]
    pub teams: bool,

    /// Restrict the run to these logins
    #[arg(long, value_delimiter = ',', value_name = "LOGIN")]
    pub users: Vec<String>,

    /// Only process seats created since the last recorded run
    #[arg(long)]
    pub incremental: bool,

    /// Provision missing cost centers before assigning
    #[arg(long)]
    pub create_missing: bool,

    /// Ensure a zero-amount blocking budget per target cost center
    #[arg(long)]
    pub budgets: bool,

    /// Skip the per-user membership check before adding
    #[arg(long)]
    pub fast: bool,
}

pub async fn execute(args: SyncArgs, ctx: &AppContext) -> Result<()> {
    ctx.config.validate()?;
    if args.teams {
        ctx.config.validate_teams()?;
        if args.incremental {
            return Err(CostsyncError::InvalidInput(
                "--incremental filters the seat roster and only works in PRU mode".to_string(),
            ));
        }
    } else if !args.create_missing {
        ctx.config.validate_pru()?;
    }

    let desired = if args.teams {
        build_teams_state(&args, ctx).await?
    } else {
        build_pru_state(&args, ctx).await?
    };

    if desired.is_empty() {
        emit("Nothing to sync: the desired state is empty.\n")?;
        return Ok(());
    }
    info!(
        cost_centers = desired.len(),
        users = desired::distinct_users(&desired),
        "desired state ready"
    );

    let plan = Reconciler::plan(&desired);
    emit(&plan.to_string())?;

    if args.mode == Mode::Plan {
        info!("plan mode; no changes made");
        return Ok(());
    }

    if !confirm_apply(args.yes)? {
        emit("Sync cancelled.\n")?;
        return Ok(());
    }

    let provisioner = Provisioner::new(ctx.api.clone(), ctx.cache.clone());
    let known_ids = if args.teams { BTreeMap::new() } else { configured_pru_ids(ctx) };
    let create_missing = args.create_missing || (args.teams && ctx.config.teams.auto_create);
    let mut report = SyncReport::new();
    let targets =
        resolve_targets(&provisioner, &desired, &known_ids, create_missing, &mut report).await?;

    let options = SyncOptions {
        fast: args.fast,
        remove_orphans: args.teams && ctx.config.teams.full_sync,
    };
    let reconciler = Reconciler::new(ctx.api.clone());
    report.merge(reconciler.apply(&targets, options).await);
    emit(&report.to_string())?;

    if args.budgets {
        let pairs: Vec<(String, String)> = targets
            .iter()
            .map(|target| (target.cost_center_id.clone(), target.display_name.clone()))
            .collect();
        let created = ensure_budgets(&ctx.api, &provisioner, &pairs).await?;
        emit(&format!("Budgets created: {created}\n"))?;
    }

    let state = RunState::new(&ctx.config.state);
    if report.is_clean() {
        if let Err(e) = state.record_run(Utc::now()) {
            warn!(error = %e, "failed to record the run timestamp");
        }
    } else {
        info!("failures present; keeping the previous incremental timestamp");
    }

    Ok(())
}

/// Fetch and filter the roster, run the PRU rule, group by the
/// configured display names.
async fn build_pru_state(args: &SyncArgs, ctx: &AppContext) -> Result<DesiredState> {
    let mut users = ctx.api.copilot_users().await?;
    info!(count = users.len(), "fetched seat roster");

    if args.incremental {
        let since = RunState::new(&ctx.config.state).last_run();
        if since.is_none() {
            info!("no previous run recorded; processing the full roster");
        }
        let before = users.len();
        users = filter_created_since(users, since);
        info!(before, after = users.len(), "applied incremental filter");
    }

    if !args.users.is_empty() {
        users = filter_logins(users, &args.users);
        info!(count = users.len(), "applied login filter");
    }

    let resolver = PruResolver::new(&ctx.config.pru).with_targets(
        ctx.config.pru.no_pru_cost_center_name.clone(),
        ctx.config.pru.pru_cost_center_name.clone(),
    );
    resolver.assign_all(&mut users);

    let mut summary = String::from("Assignment summary:\n");
    for (cost_center, count) in resolver.summarize(&users) {
        summary.push_str(&format!("  {cost_center}: {count} user(s)\n"));
    }
    emit(&summary)?;

    Ok(desired::from_users(&users))
}

async fn build_teams_state(args: &SyncArgs, ctx: &AppContext) -> Result<DesiredState> {
    let resolver = TeamResolver::new(ctx.api.clone(), ctx.config.teams.clone());
    let resolved = resolver.resolve_all().await;
    let mut state = desired::from_team_assignments(&resolved);

    if !args.users.is_empty() {
        state = restrict_to_logins(state, &args.users);
    }
    Ok(state)
}

/// Turn desired groups into reconciler targets, resolving each
/// cost-center name to its billing id. Unresolvable groups are
/// recorded as failed and skipped, never aborting the others.
async fn resolve_targets(
    provisioner: &Provisioner,
    desired: &DesiredState,
    known_ids: &BTreeMap<String, String>,
    create_missing: bool,
    report: &mut SyncReport,
) -> Result<Vec<SyncTarget>> {
    let mut preloaded =
        if create_missing { provisioner.preload_active().await? } else { BTreeMap::new() };

    let mut targets = Vec::new();
    for (name, logins) in desired {
        let users: Vec<String> = logins.iter().cloned().collect();
        let resolved = if let Some(id) = known_ids.get(name) {
            Ok(Some(id.clone()))
        } else if create_missing {
            provisioner.ensure_exists_with(name, &mut preloaded).await.map(Some)
        } else {
            provisioner.lookup(name).await
        };

        match resolved {
            Ok(Some(id)) => targets.push(SyncTarget {
                cost_center_id: id,
                display_name: name.clone(),
                users,
            }),
            Ok(None) => {
                warn!(
                    cost_center = %name,
                    "no active cost center carries this name; skipping (use --create-missing)"
                );
                report.record_failures(name, &users);
            }
            Err(e) => {
                warn!(cost_center = %name, error = %e, "failed to resolve cost center; skipping");
                report.record_failures(name, &users);
            }
        }
    }
    Ok(targets)
}

/// The name-to-id pairs already present in the PRU configuration.
fn configured_pru_ids(ctx: &AppContext) -> BTreeMap<String, String> {
    let pru = &ctx.config.pru;
    let mut ids = BTreeMap::new();
    if !pru.no_pru_cost_center_id.trim().is_empty() {
        ids.insert(pru.no_pru_cost_center_name.clone(), pru.no_pru_cost_center_id.clone());
    }
    if !pru.pru_cost_center_id.trim().is_empty() {
        ids.insert(pru.pru_cost_center_name.clone(), pru.pru_cost_center_id.clone());
    }
    ids
}

fn filter_created_since(users: Vec<CopilotUser>, since: Option<DateTime<Utc>>) -> Vec<CopilotUser> {
    match since {
        None => users,
        // A seat without a creation timestamp cannot be ruled out
        Some(cutoff) => users
            .into_iter()
            .filter(|user| user.created_at.map_or(true, |created| created > cutoff))
            .collect(),
    }
}

fn filter_logins(users: Vec<CopilotUser>, logins: &[String]) -> Vec<CopilotUser> {
    let wanted = wanted_set(logins);
    users.into_iter().filter(|user| wanted.contains(user.login.as_str())).collect()
}

fn restrict_to_logins(state: DesiredState, logins: &[String]) -> DesiredState {
    let wanted = wanted_set(logins);
    state
        .into_iter()
        .filter_map(|(cost_center, users)| {
            let kept: BTreeSet<String> =
                users.into_iter().filter(|login| wanted.contains(login.as_str())).collect();
            (!kept.is_empty()).then_some((cost_center, kept))
        })
        .collect()
}

fn wanted_set(logins: &[String]) -> BTreeSet<&str> {
    logins.iter().map(|login| login.trim()).filter(|login| !login.is_empty()).collect()
}

fn confirm_apply(skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    emit("Type 'apply' to write these changes, anything else to abort: ")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| CostsyncError::Internal(format!("failed to read confirmation: {}", e)))?;
    Ok(is_apply_confirmation(&line))
}

fn is_apply_confirmation(line: &str) -> bool {
    line.trim() == "apply"
}
