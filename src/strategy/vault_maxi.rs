//! Live [`ExposureProgram`] backed by Ocean queries and the wallet gateway.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{info, warn};

use super::decision::Action;
use super::ratio::{next_collateral_ratio, ExposurePlan};
use super::traits::{ExposureProgram, NotificationChannel};
use crate::domain::{CollateralRatio, Settings, Vault};
use crate::error::Result;
use crate::signing::{ActionRequest, WalletGateway};

pub struct VaultMaxiProgram {
    settings: Settings,
    wallet: WalletGateway,
    /// Symbols of enabled pool pairs, loaded by `init`
    pools: HashSet<String>,
}

impl VaultMaxiProgram {
    pub fn new(settings: Settings, wallet: WalletGateway) -> Self {
        Self {
            settings,
            wallet,
            pools: HashSet::new(),
        }
    }

    /// Configuration problems, empty when the program may act
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.settings.address.trim().is_empty() {
            errors.push("address is not set".to_string());
        }
        if self.settings.vault.trim().is_empty() {
            errors.push("vault is not set".to_string());
        }
        if self.settings.lm_token.trim().is_empty() {
            errors.push("LM token is not set".to_string());
        } else if !self.pools.contains(&self.settings.lm_pair()) {
            errors.push(format!("pool {} does not exist", self.settings.lm_pair()));
        }
        if let Err(band_errors) = self.settings.band().validate() {
            errors.extend(band_errors);
        }
        if !self.wallet.can_execute() {
            errors.push("no signer configured and dry run disabled".to_string());
        }

        errors
    }

    fn request(&self, action: Action, vault: &Vault, plan: Option<&ExposurePlan>) -> ActionRequest {
        ActionRequest {
            action,
            vault_id: vault.id.clone(),
            address: self.wallet.address().to_string(),
            lm_token: self.settings.lm_token.clone(),
            target_ratio: plan.map(|p| p.target_ratio),
            loan_delta_usd: plan.map(|p| p.loan_delta_usd),
            reinvest_threshold: self.settings.reinvest_threshold(),
        }
    }

    async fn change_exposure(
        &self,
        action: Action,
        vault: &Vault,
        channel: &dyn NotificationChannel,
    ) -> Result<bool> {
        let plan = ExposurePlan::for_action(
            action,
            vault,
            next_collateral_ratio(vault),
            &self.settings.band(),
        );
        let verb = if plan.is_repay() { "repaying" } else { "borrowing" };
        channel
            .send(&format!(
                "{}: {} {} USD of loans to reach {}% ({} LM)",
                action,
                verb,
                plan.loan_delta_usd.abs().round_dp(2),
                plan.target_ratio.normalize(),
                self.settings.lm_pair()
            ))
            .await;

        let receipt = self
            .wallet
            .execute(&self.request(action, vault, Some(&plan)))
            .await?;
        if !receipt.tx_ids.is_empty() {
            channel
                .log(&format!("{} sent txs: {}", action, receipt.tx_ids.join(", ")))
                .await;
        }
        if !receipt.success {
            warn!(
                "{} reported failure: {}",
                action,
                receipt.message.as_deref().unwrap_or("no details")
            );
        }
        Ok(receipt.success)
    }
}

#[async_trait]
impl ExposureProgram for VaultMaxiProgram {
    async fn init(&mut self) -> Result<()> {
        let pairs = self.wallet.ocean().list_pool_pairs().await?;
        self.pools = pairs
            .into_iter()
            .filter(|p| p.status)
            .map(|p| p.symbol)
            .collect();
        info!("initialized for {} with {} pools", self.wallet.address(), self.pools.len());
        Ok(())
    }

    async fn is_valid(&self) -> Result<bool> {
        let errors = self.validation_errors();
        for e in &errors {
            warn!("invalid configuration: {}", e);
        }
        Ok(errors.is_empty())
    }

    async fn get_vault(&self) -> Result<Option<Vault>> {
        self.wallet.ocean().get_vault(&self.settings.vault).await
    }

    fn next_collateral_ratio(&self, vault: &Vault) -> CollateralRatio {
        next_collateral_ratio(vault)
    }

    async fn decrease_exposure(
        &self,
        vault: &Vault,
        channel: &dyn NotificationChannel,
    ) -> Result<bool> {
        self.change_exposure(Action::DecreaseExposure, vault, channel)
            .await
    }

    async fn increase_exposure(
        &self,
        vault: &Vault,
        channel: &dyn NotificationChannel,
    ) -> Result<bool> {
        self.change_exposure(Action::IncreaseExposure, vault, channel)
            .await
    }

    async fn check_and_do_reinvest(
        &self,
        vault: &Vault,
        channel: &dyn NotificationChannel,
    ) -> Result<bool> {
        let Some(threshold) = self.settings.reinvest_threshold() else {
            return Ok(false);
        };

        info!("checking rewards above {} for reinvest", threshold);
        let receipt = self
            .wallet
            .execute(&self.request(Action::Reinvest, vault, None))
            .await?;
        let changed = receipt.success && receipt.changed;
        if changed {
            channel
                .send(&format!("reinvested rewards into vault ({} txs)", receipt.tx_ids.len()))
                .await;
        }
        Ok(changed)
    }
}
