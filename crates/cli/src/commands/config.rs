//! Effective-configuration display

use clap::Args;
use costsync_domain::{Config, CostsyncError, Result};

use crate::commands::emit;
use crate::context::AppContext;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {}

pub fn execute(_args: ConfigArgs, ctx: &AppContext) -> Result<()> {
    let rendered = render_config(&ctx.config)?;
    emit(&rendered)?;

    match ctx.config.validate() {
        Ok(()) => emit("Validation: OK\n"),
        Err(e) => emit(&format!("Validation: FAILED - {e}\n")),
    }
}

/// Serialize the effective configuration with the token redacted.
fn render_config(config: &Config) -> Result<String> {
    let mut display = config.clone();
    if !display.github.token.is_empty() {
        display.github.token = "<redacted>".to_string();
    }

    toml::to_string_pretty(&display)
        .map_err(|e| CostsyncError::Internal(format!("failed to render configuration: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted_in_output() {
        let mut config = Config::default();
        config.github.token = "ghp_super_secret".to_string();

        let rendered = render_config(&config).expect("config should render");
        assert!(!rendered.contains("ghp_super_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn empty_token_stays_empty() {
        let rendered = render_config(&Config::default()).expect("config should render");
        assert!(!rendered.contains("<redacted>"));
    }
}
