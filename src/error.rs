use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::VaultState;
use crate::strategy::Action;

/// Main error type for the vault maxi bot
#[derive(Error, Debug)]
pub enum MaxiError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ocean API error: HTTP {status}: {body}")]
    OceanApi { status: u16, body: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Vault data errors
    #[error("Invalid vault data: {0}")]
    InvalidVaultData(String),

    // Control loop stops (user-facing text)
    #[error(transparent)]
    Control(#[from] ControlError),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Remote signer errors
    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Signature error: {0}")]
    Signature(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for MaxiError
pub type Result<T> = std::result::Result<T, MaxiError>;

/// Reasons a run stops without (or after a failed) exposure change.
///
/// The `Display` text is what the operator receives on the notification channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("Configuration error. please check your values")]
    Configuration,

    #[error("Error: vault is gone")]
    VaultNotFound { vault_id: String },

    #[error("Error: vault not active, its {state}")]
    VaultNotActive { state: VaultState },

    #[error("less than 10 dollar in the vault, can't work with that")]
    InsufficientCollateral { collateral_value: Decimal },

    #[error("Error: {action} executed with problems")]
    ExecutionFailure { action: Action },
}

impl MaxiError {
    /// Text sent to the operator when this error ends a run
    pub fn user_message(&self) -> String {
        match self {
            MaxiError::Control(err) => err.to_string(),
            other => format!("Error: {}", other),
        }
    }
}
