//! Cost-center provisioning command

use std::sync::Arc;

use clap::Args;
use costsync_core::{BillingApi, Provisioner, TeamResolver};
use costsync_domain::{CostsyncError, Result};
use tracing::{info, warn};

use crate::commands::emit;
use crate::context::AppContext;

/// Arguments for the provision command
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Derive cost-center names from team membership instead of the PRU pair
    #[arg(long)]
    pub teams: bool,

    /// Also ensure a zero-amount blocking budget per cost center
    #[arg(long)]
    pub budgets: bool,
}

pub async fn execute(args: ProvisionArgs, ctx: &AppContext) -> Result<()> {
    ctx.config.validate()?;

    let names: Vec<String> = if args.teams {
        ctx.config.validate_teams()?;
        let resolver = TeamResolver::new(ctx.api.clone(), ctx.config.teams.clone());
        resolver.resolve_all().await.into_keys().collect()
    } else {
        vec![
            ctx.config.pru.no_pru_cost_center_name.clone(),
            ctx.config.pru.pru_cost_center_name.clone(),
        ]
    };

    if names.is_empty() {
        emit("No cost centers to provision.\n")?;
        return Ok(());
    }

    let provisioner = Provisioner::new(ctx.api.clone(), ctx.cache.clone());
    let mut known = provisioner.preload_active().await?;

    let mut out = String::new();
    let mut ensured = Vec::new();
    let mut failed = 0usize;
    for name in &names {
        match provisioner.ensure_exists_with(name, &mut known).await {
            Ok(id) => {
                out.push_str(&format!("{name} -> {id}\n"));
                ensured.push((id, name.clone()));
            }
            Err(e) => {
                warn!(cost_center = %name, error = %e, "failed to provision cost center");
                out.push_str(&format!("{name} -> FAILED ({e})\n"));
                failed += 1;
            }
        }
    }
    emit(&out)?;

    if args.budgets {
        let created = ensure_budgets(&ctx.api, &provisioner, &ensured).await?;
        emit(&format!("Budgets created: {created}\n"))?;
    }

    if failed > 0 {
        return Err(CostsyncError::Api(format!(
            "{failed} of {} cost center(s) failed to provision",
            names.len()
        )));
    }
    Ok(())
}

/// Ensure a blocking budget covers each `(id, name)` pair. Returns the
/// number created. An enterprise without the budgets API logs a
/// warning and counts as zero.
pub(crate) async fn ensure_budgets(
    api: &Arc<dyn BillingApi>,
    provisioner: &Provisioner,
    cost_centers: &[(String, String)],
) -> Result<usize> {
    let existing = match api.budgets().await {
        Ok(existing) => existing,
        Err(CostsyncError::BudgetsUnavailable(_)) => {
            warn!("budgets API is not available for this enterprise; skipping budget provisioning");
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    let mut created = 0usize;
    for (id, name) in cost_centers {
        match provisioner.ensure_budget(id, name, &existing).await {
            Ok(true) => created += 1,
            Ok(false) => {}
            Err(CostsyncError::BudgetsUnavailable(_)) => {
                warn!(
                    "budgets API is not available for this enterprise; \
                     skipping budget provisioning"
                );
                return Ok(created);
            }
            Err(e) => warn!(cost_center = %name, error = %e, "failed to ensure budget"),
        }
    }

    info!(created, total = cost_centers.len(), "budget provisioning complete");
    Ok(created)
}
