//! Seat roster listing

use clap::Args;
use costsync_domain::{CopilotUser, Result};

use crate::commands::emit;
use crate::context::AppContext;

/// Arguments for the users command
#[derive(Args, Debug)]
pub struct UsersArgs {}

pub async fn execute(_args: UsersArgs, ctx: &AppContext) -> Result<()> {
    ctx.config.validate()?;

    let users = ctx.api.copilot_users().await?;
    emit(&format_roster(&users))
}

fn format_roster(users: &[CopilotUser]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:<28} {:<12} {:<12}\n",
        "LOGIN", "NAME", "CREATED", "LAST ACTIVITY"
    ));

    for user in users {
        out.push_str(&format!(
            "{:<24} {:<28} {:<12} {:<12}\n",
            user.login,
            user.name.as_deref().unwrap_or("-"),
            user.created_at.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string()),
            user.last_activity_at
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string()),
        ));
    }

    out.push_str(&format!("\nTotal seats: {}\n", users.len()));
    out
}
