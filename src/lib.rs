pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod signing;
pub mod strategy;

pub use config::AppConfig;
pub use domain::{
    CollateralRatio, ExecutionResult, MaxiEvent, RatioBand, Settings, SettingsOverride, Vault,
    VaultState,
};
pub use error::{ControlError, MaxiError, Result};
pub use signing::WalletGateway;
pub use strategy::{
    Action, CheckProgram, ControlLoop, ExposureProgram, LiveProgramFactory, NotificationChannel,
    ProgramFactory, SettingsStore,
};
