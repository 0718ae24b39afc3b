//! Mapping-cache maintenance commands

use clap::{Args, Subcommand};
use costsync_domain::Result;
use costsync_infra::CostCenterCache;

use crate::commands::emit;
use crate::context::AppContext;

/// Cache maintenance commands
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show entry counts, freshness, and the cache location
    Stats,
    /// Remove every cached mapping
    Clear,
    /// Evict entries older than the configured TTL
    Cleanup,
}

pub fn execute(args: CacheArgs, ctx: &AppContext) -> Result<()> {
    let cache = CostCenterCache::open(&ctx.config.cache);

    match args.command {
        CacheCommands::Stats => emit(&format!("{}\n", cache.stats())),
        CacheCommands::Clear => {
            let removed = cache.clear()?;
            emit(&format!("Removed {removed} cached mapping(s).\n"))
        }
        CacheCommands::Cleanup => {
            let evicted = cache.cleanup()?;
            emit(&format!("Evicted {evicted} expired mapping(s).\n"))
        }
    }
}
