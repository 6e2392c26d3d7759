//! vault-maxi CLI
//!
//! Commands:
//! - `vault-maxi run` - one rebalancing pass against the configured vault
//! - `vault-maxi check` - verify the setup and report, no vault changes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::domain::{MaxiEvent, SettingsOverride};

/// Vault maxi: keeps a loan vault inside its collateral ratio band
#[derive(Parser, Debug)]
#[command(name = "vault-maxi")]
#[command(author, version, about = "Keeps a loan vault inside its collateral ratio band")]
pub struct Cli {
    /// Directory holding default.toml and environment overlays
    #[arg(long, env = "VAULTMAXI_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// Plan actions without sending transactions
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one pass of the control loop
    Run {
        /// Invocation event as JSON
        #[arg(long, conflicts_with = "event_file")]
        event: Option<String>,
        /// Read the invocation event from a JSON file
        #[arg(long)]
        event_file: Option<PathBuf>,
        /// Override the lower band edge
        #[arg(long)]
        min_ratio: Option<Decimal>,
        /// Override the upper band edge
        #[arg(long)]
        max_ratio: Option<Decimal>,
        /// Override the LM token
        #[arg(long)]
        lm_token: Option<String>,
    },

    /// Check the setup without touching the vault
    Check,
}

impl Commands {
    /// Build the invocation event; flags win over fields of a supplied event
    pub fn into_event(self) -> Result<Option<MaxiEvent>> {
        match self {
            Commands::Check => Ok(Some(MaxiEvent::setup_check())),
            Commands::Run {
                event,
                event_file,
                min_ratio,
                max_ratio,
                lm_token,
            } => {
                let raw = match (event, event_file) {
                    (Some(json), _) => Some(json),
                    (None, Some(path)) => Some(
                        std::fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read event file {}", path.display()))?,
                    ),
                    (None, None) => None,
                };

                let mut parsed = match raw {
                    Some(json) => Some(
                        serde_json::from_str::<MaxiEvent>(&json).context("Invalid event JSON")?,
                    ),
                    None => None,
                };

                if min_ratio.is_some() || max_ratio.is_some() || lm_token.is_some() {
                    let event = parsed.get_or_insert_with(MaxiEvent::default);
                    let patch = event
                        .override_settings
                        .get_or_insert_with(SettingsOverride::default);
                    if min_ratio.is_some() {
                        patch.min_collateral_ratio = min_ratio;
                    }
                    if max_ratio.is_some() {
                        patch.max_collateral_ratio = max_ratio;
                    }
                    if lm_token.is_some() {
                        patch.lm_token = lm_token;
                    }
                }

                Ok(parsed)
            }
        }
    }
}
