//! costsync - Copilot seat to cost-center reconciliation
//!
//! The binary wires configuration, the billing API client, and the
//! reconciliation engine into a handful of subcommands. All remote
//! work lives behind the engine's port traits; this crate only parses
//! arguments, builds the context, and renders results.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod context;

use context::AppContext;
use costsync_domain::{CostsyncError, Result};

/// costsync - reconcile Copilot license holders against billing cost centers
#[derive(Parser, Debug)]
#[command(name = "costsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Raise the log filter to debug
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Path to the configuration file (default: probe costsync.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the Copilot seat roster
    Users(commands::users::UsersArgs),

    /// Show the effective configuration and its validation status
    Config(commands::config::ConfigArgs),

    /// Reconcile cost-center membership (plan by default)
    Sync(commands::sync::SyncArgs),

    /// Ensure the configured cost centers exist
    Provision(commands::provision::ProvisionArgs),

    /// Cost-center mapping cache maintenance
    Cache(commands::cache::CacheArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load .env before the config layer reads the environment
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }

    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(exit_code(&e));
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::new(cli.config.clone())?;

    match cli.command {
        Commands::Users(args) => commands::users::execute(args, &ctx).await,
        Commands::Config(args) => commands::config::execute(args, &ctx),
        Commands::Sync(args) => commands::sync::execute(args, &ctx).await,
        Commands::Provision(args) => commands::provision::execute(args, &ctx).await,
        Commands::Cache(args) => commands::cache::execute(args, &ctx),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn exit_code(error: &CostsyncError) -> i32 {
    match error {
        CostsyncError::Config(_) | CostsyncError::InvalidInput(_) => 2,
        CostsyncError::Network(_) | CostsyncError::RateLimited(_) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::parse_from(["costsync", "users", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Users(_)));
    }

    #[test]
    fn config_errors_exit_with_a_usage_code() {
        assert_eq!(exit_code(&CostsyncError::Config("missing token".to_string())), 2);
        assert_eq!(exit_code(&CostsyncError::Network("timeout".to_string())), 3);
        assert_eq!(exit_code(&CostsyncError::Api("boom".to_string())), 1);
    }
}
