use std::sync::Arc;
use std::time::Duration;

use super::check::SetupCheckProgram;
use super::traits::{CheckProgram, ExposureProgram, NotificationChannel, ProgramFactory};
use super::vault_maxi::VaultMaxiProgram;
use crate::adapters::{LogNotifier, OceanClient, TelegramNotifier};
use crate::config::AppConfig;
use crate::domain::Settings;
use crate::error::Result;
use crate::signing::{SignerClient, WalletGateway};

/// Wires Ocean, Telegram and the remote signer from [`AppConfig`]
pub struct LiveProgramFactory {
    config: AppConfig,
    ocean: OceanClient,
    signer: Option<Arc<SignerClient>>,
}

impl LiveProgramFactory {
    pub fn new(config: AppConfig) -> Result<Self> {
        let ocean = OceanClient::new(
            &config.ocean.url,
            &config.ocean.network,
            Duration::from_secs(config.ocean.timeout_secs),
        )?;
        let signer = config
            .signer
            .as_ref()
            .map(SignerClient::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            config,
            ocean,
            signer,
        })
    }

    fn wallet(&self, settings: &Settings) -> WalletGateway {
        WalletGateway::new(
            &settings.address,
            self.ocean.clone(),
            self.signer.clone(),
            self.config.is_dry_run(),
        )
    }
}

impl ProgramFactory for LiveProgramFactory {
    fn notification_channel(&self, settings: &Settings) -> Arc<dyn NotificationChannel> {
        let prefix = settings.message_prefix();
        match &self.config.telegram {
            Some(telegram) => Arc::new(TelegramNotifier::new(telegram, &prefix)),
            None => Arc::new(LogNotifier::new(&prefix)),
        }
    }

    fn exposure_program(&self, settings: &Settings) -> Result<Box<dyn ExposureProgram>> {
        Ok(Box::new(VaultMaxiProgram::new(
            settings.clone(),
            self.wallet(settings),
        )))
    }

    fn check_program(&self, settings: &Settings) -> Result<Box<dyn CheckProgram>> {
        Ok(Box::new(SetupCheckProgram::new(
            settings.clone(),
            self.wallet(settings),
        )))
    }
}
