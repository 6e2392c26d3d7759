//! Setup verification: reports whether the configuration can work, changes nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use super::traits::{CheckProgram, NotificationChannel};
use crate::domain::{Settings, Vault};
use crate::error::Result;
use crate::signing::WalletGateway;

/// Ratio points the lower band edge should keep above the protocol minimum
pub const LIQUIDATION_SAFETY_MARGIN: Decimal = Decimal::TEN;

/// Whether the settings are complete enough to run a setup check
pub fn can_do_check(settings: &Settings) -> bool {
    !settings.address.trim().is_empty()
        && !settings.vault.trim().is_empty()
        && !settings.lm_token.trim().is_empty()
}

/// Describe the current settings, for when a check cannot run
pub fn build_current_settings_into_message(settings: &Settings) -> String {
    let or_missing = |value: &str| {
        if value.trim().is_empty() {
            "<not set>".to_string()
        } else {
            value.to_string()
        }
    };

    format!(
        "Could not run setup check, settings incomplete.\n\
         address: {}\n\
         vault: {}\n\
         min collateral ratio: {}\n\
         max collateral ratio: {}\n\
         LM token: {}\n\
         reinvest threshold: {}",
        or_missing(&settings.address),
        or_missing(&settings.vault),
        settings.min_collateral_ratio.normalize(),
        settings.max_collateral_ratio.normalize(),
        or_missing(&settings.lm_token),
        settings
            .reinvest_threshold()
            .map(|t| t.normalize().to_string())
            .unwrap_or_else(|| "disabled".to_string()),
    )
}

/// One line of a setup report
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub ok: bool,
    pub text: String,
}

impl Finding {
    fn new(ok: bool, text: impl Into<String>) -> Self {
        Self {
            ok,
            text: text.into(),
        }
    }
}

/// Result of a setup check
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub checked_at: DateTime<Utc>,
    pub findings: Vec<Finding>,
}

impl SetupReport {
    /// Evaluate settings against what the chain reports
    pub fn evaluate(
        settings: &Settings,
        vault: Option<&Vault>,
        lm_pool_exists: bool,
        can_execute: bool,
        dry_run: bool,
    ) -> Self {
        let mut findings = Vec::new();

        findings.push(Finding::new(true, format!("monitoring address {}", settings.address)));

        match vault {
            Some(v) => {
                findings.push(Finding::new(true, format!("vault {} found", v.id)));
                findings.push(Finding::new(
                    v.is_owned_by(&settings.address),
                    format!("vault owned by {}", v.owner_address),
                ));
                findings.push(Finding::new(
                    !v.state.blocks_actions(),
                    format!("vault state {}", v.state),
                ));
                let safe_floor = v.loan_scheme.min_collateral_ratio + LIQUIDATION_SAFETY_MARGIN;
                findings.push(Finding::new(
                    settings.min_collateral_ratio >= safe_floor,
                    format!(
                        "min collateral ratio {} vs loan scheme minimum {} (want at least {})",
                        settings.min_collateral_ratio.normalize(),
                        v.loan_scheme.min_collateral_ratio.normalize(),
                        safe_floor.normalize()
                    ),
                ));
            }
            None => findings.push(Finding::new(false, format!("vault {} not found", settings.vault))),
        }

        let band = settings.band();
        findings.push(Finding::new(
            band.validate().is_ok(),
            format!("collateral ratio band {}", band),
        ));
        findings.push(Finding::new(
            lm_pool_exists,
            format!("LM pool {}", settings.lm_pair()),
        ));
        findings.push(Finding::new(
            can_execute,
            if dry_run {
                "dry run, no transactions will be sent".to_string()
            } else if can_execute {
                "signer configured".to_string()
            } else {
                "no signer configured".to_string()
            },
        ));
        findings.push(Finding::new(
            true,
            match settings.reinvest_threshold() {
                Some(t) => format!("reinvest above {}", t.normalize()),
                None => "reinvest disabled".to_string(),
            },
        ));

        Self {
            checked_at: Utc::now(),
            findings,
        }
    }

    pub fn all_ok(&self) -> bool {
        self.findings.iter().all(|f| f.ok)
    }

    pub fn to_message(&self) -> String {
        let mut lines = vec![format!(
            "Setup-Check result ({})",
            self.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        )];
        for finding in &self.findings {
            lines.push(format!("{} {}", if finding.ok { "✓" } else { "✗" }, finding.text));
        }
        lines.push(if self.all_ok() {
            "all checks passed".to_string()
        } else {
            "some checks failed, please fix your settings".to_string()
        });
        lines.join("\n")
    }
}

/// Live [`CheckProgram`]
pub struct SetupCheckProgram {
    settings: Settings,
    wallet: WalletGateway,
    vault: Option<Vault>,
    lm_pool_exists: bool,
}

impl SetupCheckProgram {
    pub fn new(settings: Settings, wallet: WalletGateway) -> Self {
        Self {
            settings,
            wallet,
            vault: None,
            lm_pool_exists: false,
        }
    }
}

#[async_trait]
impl CheckProgram for SetupCheckProgram {
    async fn init(&mut self) -> Result<()> {
        self.vault = self.wallet.ocean().get_vault(&self.settings.vault).await?;
        let pair = self.settings.lm_pair();
        self.lm_pool_exists = self
            .wallet
            .ocean()
            .list_pool_pairs()
            .await?
            .iter()
            .any(|p| p.symbol == pair);
        Ok(())
    }

    async fn report_check(&self, channel: &dyn NotificationChannel) -> Result<()> {
        let report = SetupReport::evaluate(
            &self.settings,
            self.vault.as_ref(),
            self.lm_pool_exists,
            self.wallet.can_execute(),
            self.wallet.is_dry_run(),
        );
        let message = report.to_message();
        info!("setup check finished, all ok: {}", report.all_ok());
        channel.log(&message).await;
        channel.send(&message).await;
        Ok(())
    }
}
