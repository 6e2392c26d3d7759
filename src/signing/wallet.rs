use std::sync::Arc;
use tracing::{info, warn};

use super::signer::{ActionReceipt, ActionRequest, SignerClient};
use crate::adapters::OceanClient;
use crate::error::{MaxiError, Result};

/// Chain connectivity plus signing capability for one owner address
#[derive(Clone)]
pub struct WalletGateway {
    address: String,
    ocean: OceanClient,
    signer: Option<Arc<SignerClient>>,
    dry_run: bool,
}

impl WalletGateway {
    pub fn new(
        address: &str,
        ocean: OceanClient,
        signer: Option<Arc<SignerClient>>,
        dry_run: bool,
    ) -> Self {
        if dry_run {
            info!("Wallet gateway for {} in dry run mode", address);
        }
        Self {
            address: address.to_string(),
            ocean,
            signer,
            dry_run,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn ocean(&self) -> &OceanClient {
        &self.ocean
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether actions can be carried out (or simulated)
    pub fn can_execute(&self) -> bool {
        self.dry_run || self.signer.is_some()
    }

    /// Hand an action to the signer; in dry run only log it
    pub async fn execute(&self, request: &ActionRequest) -> Result<ActionReceipt> {
        if self.dry_run {
            info!(
                "[DRY RUN] would submit {} for vault {}: target={:?} loan_delta_usd={:?} reinvest_threshold={:?}",
                request.action,
                request.vault_id,
                request.target_ratio,
                request.loan_delta_usd,
                request.reinvest_threshold
            );
            return Ok(ActionReceipt {
                success: true,
                changed: false,
                tx_ids: Vec::new(),
                message: Some("dry run".to_string()),
            });
        }

        let signer = self.signer.as_ref().ok_or_else(|| {
            warn!("no signer configured for {}", self.address);
            MaxiError::Signer("no signer configured".to_string())
        })?;
        signer.execute(request).await
    }
}

impl std::fmt::Debug for WalletGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletGateway")
            .field("address", &self.address)
            .field("signer", &self.signer.is_some())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Action;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn gateway(dry_run: bool) -> WalletGateway {
        let ocean = OceanClient::new("https://ocean.invalid", "mainnet", Duration::from_secs(1))
            .unwrap();
        WalletGateway::new("df1qowner", ocean, None, dry_run)
    }

    fn request() -> ActionRequest {
        ActionRequest {
            action: Action::IncreaseExposure,
            vault_id: "vault".to_string(),
            address: "df1qowner".to_string(),
            lm_token: "GLD".to_string(),
            target_ratio: None,
            loan_delta_usd: None,
            reinvest_threshold: None,
        }
    }

    #[tokio::test]
    async fn dry_run_succeeds_without_signer() {
        let gw = gateway(true);
        assert!(gw.can_execute());
        let receipt = assert_ok!(gw.execute(&request()).await);
        assert!(receipt.success);
        assert!(!receipt.changed);
    }

    #[tokio::test]
    async fn live_without_signer_fails() {
        let gw = gateway(false);
        assert!(!gw.can_execute());
        assert_err!(gw.execute(&request()).await);
    }
}
