//! Teams-mode resolution
//!
//! Derives cost-center membership from team membership: enumerate the
//! teams in scope, name a cost center per team (manual table or
//! template), fetch members, and merge per login. A login that appears
//! under several teams keeps the assignment of the last team processed
//! (last-write-wins); the passed-over teams are logged so operators can
//! spot unintended overwrites.
//!
//! Team enumeration order follows the API and is not guaranteed stable
//! across pages or runs, so which team wins for a multi-team user can
//! vary run to run. That nondeterminism is inherent to the contract and
//! is surfaced in the logs rather than hidden behind an invented
//! priority order.

use std::collections::BTreeMap;
use std::sync::Arc;

use costsync_domain::{MappingMode, ScopeKind, Team, TeamScope, TeamsConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::ports::BillingApi;

/// Placeholders recognized inside `name_template`.
static TEMPLATE_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("TEMPLATE_VAR should compile - this is a bug")
});

/// How many multi-team users are logged individually before the rest
/// are collapsed into a single count.
const CONFLICT_LOG_LIMIT: usize = 10;

/// One member's team-derived assignment before flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAssignment {
    pub login: String,
    pub scope_label: String,
    pub team_slug: String,
}

/// Resolves team membership into per-cost-center assignments.
pub struct TeamResolver {
    api: Arc<dyn BillingApi>,
    config: TeamsConfig,
}

impl TeamResolver {
    pub fn new(api: Arc<dyn BillingApi>, config: TeamsConfig) -> Self {
        Self { api, config }
    }

    /// Enumerate the configured scope, resolve a cost-center name per
    /// team, fetch membership, and merge per login with
    /// last-write-wins. Failures on individual teams or scopes are
    /// logged and skipped; resolution is best-effort.
    pub async fn resolve_all(&self) -> BTreeMap<String, Vec<TeamAssignment>> {
        let teams = self.enumerate_teams().await;

        // login -> (cost center, assignment); insertion overwrites, so
        // the last processed team wins.
        let mut winners: BTreeMap<String, (String, TeamAssignment)> = BTreeMap::new();
        // login -> every team that proposed an assignment, in
        // processing order, for conflict reporting.
        let mut proposals: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for team in &teams {
            let Some(cost_center) = self.cost_center_name(team) else {
                continue;
            };
            let members = match self.api.team_members(team).await {
                Ok(members) => members,
                Err(err) => {
                    warn!(
                        team = %team.mapping_key(),
                        error = %err,
                        "failed to fetch team members; skipping team"
                    );
                    continue;
                }
            };
            if members.is_empty() {
                debug!(team = %team.mapping_key(), "skipping team with no members");
                continue;
            }
            debug!(
                team = %team.mapping_key(),
                members = members.len(),
                cost_center = %cost_center,
                "resolved team"
            );
            for login in members {
                proposals.entry(login.clone()).or_default().push(team.mapping_key());
                let assignment = TeamAssignment {
                    login: login.clone(),
                    scope_label: team.scope.label().to_string(),
                    team_slug: team.slug.clone(),
                };
                winners.insert(login, (cost_center.clone(), assignment));
            }
        }

        log_multi_team_users(&proposals);

        let mut grouped: BTreeMap<String, Vec<TeamAssignment>> = BTreeMap::new();
        for (_login, (cost_center, assignment)) in winners {
            grouped.entry(cost_center).or_default().push(assignment);
        }
        info!(
            cost_centers = grouped.len(),
            users = grouped.values().map(Vec::len).sum::<usize>(),
            "teams resolution complete"
        );
        grouped
    }

    async fn enumerate_teams(&self) -> Vec<Team> {
        let mut teams = Vec::new();
        for scope in self.scopes() {
            match self.api.teams(&scope).await {
                Ok(mut list) => {
                    info!(scope = %scope.label(), teams = list.len(), "enumerated teams");
                    teams.append(&mut list);
                }
                Err(err) => {
                    warn!(scope = %scope.label(), error = %err, "failed to list teams for scope");
                }
            }
        }
        teams
    }

    fn scopes(&self) -> Vec<TeamScope> {
        match self.config.scope {
            ScopeKind::Organization => self
                .config
                .organizations
                .iter()
                .cloned()
                .map(TeamScope::Organization)
                .collect(),
            ScopeKind::Enterprise => vec![TeamScope::Enterprise],
        }
    }

    /// Target cost-center name for a team, or `None` when the team is
    /// not mapped and must be skipped.
    fn cost_center_name(&self, team: &Team) -> Option<String> {
        match self.config.mapping_mode {
            MappingMode::Manual => {
                let key = team.mapping_key();
                let name = self.config.manual_mappings.get(&key).cloned();
                if name.is_none() {
                    warn!(team = %key, "no manual mapping for team; skipping");
                }
                name
            }
            MappingMode::Auto => Some(match render_template(&self.config.name_template, team) {
                Ok(name) => name,
                Err(variable) => {
                    error!(
                        template = %self.config.name_template,
                        variable = %variable,
                        "unknown template variable; using fallback name"
                    );
                    format!("Team: {}", team.name)
                }
            }),
        }
    }
}

/// Substitute `{team_name}`, `{team_slug}` and `{org}` into the
/// template. Returns the offending variable name when the template
/// references anything else.
fn render_template(template: &str, team: &Team) -> std::result::Result<String, String> {
    let mut unknown = None;
    let rendered = TEMPLATE_VAR.replace_all(template, |caps: &regex::Captures<'_>| {
        match &caps[1] {
            "team_name" => team.name.clone(),
            "team_slug" => team.slug.clone(),
            "org" => team.scope.label().to_string(),
            other => {
                unknown.get_or_insert_with(|| other.to_string());
                String::new()
            }
        }
    });
    match unknown {
        Some(variable) => Err(variable),
        None => Ok(rendered.into_owned()),
    }
}

/// Warn about every login proposed by more than one team: the final
/// assignment silently discarded the earlier teams, which is the
/// documented contract but worth surfacing.
fn log_multi_team_users(proposals: &BTreeMap<String, Vec<String>>) {
    let conflicted: Vec<(&String, &Vec<String>)> =
        proposals.iter().filter(|(_, teams)| teams.len() > 1).collect();
    if conflicted.is_empty() {
        return;
    }
    warn!(
        users = conflicted.len(),
        "users belong to multiple teams; the last processed team decides the cost center"
    );
    for (login, teams) in conflicted.iter().take(CONFLICT_LOG_LIMIT) {
        let winner = teams.last().map_or("", String::as_str);
        let discarded: Vec<&str> = teams[..teams.len() - 1].iter().map(String::as_str).collect();
        warn!(
            user = %login,
            winner = %winner,
            discarded = ?discarded,
            "multi-team user resolved by last-write-wins"
        );
    }
    if conflicted.len() > CONFLICT_LOG_LIMIT {
        warn!("... and {} more multi-team users", conflicted.len() - CONFLICT_LOG_LIMIT);
    }
}
