use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use vault_maxi::adapters::ConfigSettingsStore;
use vault_maxi::cli::Cli;
use vault_maxi::config::{AppConfig, LoggingConfig};
use vault_maxi::strategy::{ControlLoop, LiveProgramFactory};
use vault_maxi::{ExecutionResult, MaxiError};

mod main_runtime;

use main_runtime::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match AppConfig::load_from(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            let err = MaxiError::from(e);
            error!("Could not load configuration: {}", err);
            return finish(&ExecutionResult::from(&err));
        }
    };
    if cli.dry_run {
        config.dry_run.enabled = true;
    }
    init_logging(&config.logging);

    let config = match config.validated() {
        Ok(config) => config,
        Err(result) => return finish(&result),
    };

    let event = match cli.command.into_event() {
        Ok(event) => event,
        Err(e) => {
            error!("{:#}", e);
            return finish(&ExecutionResult::failure(format!("Error: {:#}", e)));
        }
    };
    if config.is_dry_run() {
        info!("dry run enabled, no transactions will be sent");
    }

    let store = Arc::new(ConfigSettingsStore::new(&cli.config_dir));
    let factory = match LiveProgramFactory::new(config) {
        Ok(factory) => Arc::new(factory),
        Err(e) => {
            error!("Could not set up clients: {}", e);
            return finish(&ExecutionResult::from(&e));
        }
    };
    let control = ControlLoop::new(store, factory);

    let result = control.run(event).await;
    finish(&result)
}

/// Print the run result on stdout and map it to the exit code
fn finish(result: &ExecutionResult) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string(result)?);
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
