//! Collaborator contracts consumed by [`super::ControlLoop`].
//!
//! Decouples the loop from Ocean, Telegram and the remote signer so the policy
//! can be exercised with in-memory doubles.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{CollateralRatio, Settings, Vault};
use crate::error::Result;

/// Source of the persisted operator settings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn fetch_settings(&self) -> Result<Settings>;
}

/// Human-readable status delivery. Both calls are fire-and-forget.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Operator-facing message
    async fn send(&self, text: &str);

    /// Log-level message
    async fn log(&self, text: &str);
}

/// Live connection to the vault plus the exposure-changing operations
#[async_trait]
pub trait ExposureProgram: Send + Sync {
    /// Open connectivity
    async fn init(&mut self) -> Result<()>;

    /// Configuration sanity
    async fn is_valid(&self) -> Result<bool>;

    /// `None` when the vault cannot be located
    async fn get_vault(&self) -> Result<Option<Vault>>;

    /// Ratio the vault will have once pending oracle prices become active
    fn next_collateral_ratio(&self, vault: &Vault) -> CollateralRatio;

    async fn decrease_exposure(
        &self,
        vault: &Vault,
        channel: &dyn NotificationChannel,
    ) -> Result<bool>;

    async fn increase_exposure(
        &self,
        vault: &Vault,
        channel: &dyn NotificationChannel,
    ) -> Result<bool>;

    /// Returns whether exposure changed
    async fn check_and_do_reinvest(
        &self,
        vault: &Vault,
        channel: &dyn NotificationChannel,
    ) -> Result<bool>;
}

/// Setup verification flow; never changes exposure
#[async_trait]
pub trait CheckProgram: Send + Sync {
    async fn init(&mut self) -> Result<()>;

    async fn report_check(&self, channel: &dyn NotificationChannel) -> Result<()>;
}

/// Builds the per-run collaborators from the effective settings
pub trait ProgramFactory: Send + Sync {
    fn notification_channel(&self, settings: &Settings) -> Arc<dyn NotificationChannel>;

    fn exposure_program(&self, settings: &Settings) -> Result<Box<dyn ExposureProgram>>;

    fn check_program(&self, settings: &Settings) -> Result<Box<dyn CheckProgram>>;
}
