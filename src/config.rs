use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::Path;
use tracing::error;
use url::Url;

use crate::domain::{ExecutionResult, Settings};
use crate::error::ControlError;

/// Environment variable prefix (`VAULTMAXI_OCEAN__URL`, ...)
pub const ENV_PREFIX: &str = "VAULTMAXI";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Stored operator settings
    pub settings: Settings,
    #[serde(default)]
    pub ocean: OceanConfig,
    /// Telegram delivery; log-only when absent
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    /// Remote signer; required unless dry run is enabled
    #[serde(default)]
    pub signer: Option<SignerConfig>,
    #[serde(default)]
    pub dry_run: DryRunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OceanConfig {
    /// Ocean REST endpoint
    #[serde(default = "default_ocean_url")]
    pub url: String,
    /// Network path segment (mainnet, testnet)
    #[serde(default = "default_network")]
    pub network: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ocean_url() -> String {
    "https://ocean.defichain.com".to_string()
}

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for OceanConfig {
    fn default() -> Self {
        Self {
            url: default_ocean_url(),
            network: default_network(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token for operator messages
    pub token: String,
    /// Chat receiving operator messages
    pub chat_id: String,
    /// Bot token for log messages (defaults to `token`)
    #[serde(default)]
    pub log_token: Option<String>,
    /// Chat receiving log messages; log messages are not delivered when absent
    #[serde(default)]
    pub log_chat_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
    /// Base URL of the signing service
    pub url: String,
    pub api_key: String,
    /// Shared HMAC secret
    pub secret: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DryRunConfig {
    /// Plan actions without contacting the signer
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Layered sources shared by [`AppConfig`] and the settings store
pub(crate) fn builder_for(config_dir: &Path) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        // Start with default values
        .set_default("logging.level", "info")?
        .set_default("logging.json", false)?
        .set_default("dry_run.enabled", false)?
        // Load default config file
        .add_source(File::from(config_dir.join("default.toml")).required(false))
        // Load environment-specific config (e.g., config/production.toml)
        .add_source(
            File::from(config_dir.join(
                std::env::var("VAULTMAXI_ENV").unwrap_or_else(|_| "development".to_string()),
            ))
            .required(false),
        )
        // Override with environment variables (VAULTMAXI_SETTINGS__VAULT, etc.)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        ))
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        builder_for(config_dir.as_ref())?.build()?.try_deserialize()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run.enabled
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = Url::parse(&self.ocean.url) {
            errors.push(format!("ocean.url is not a valid URL ({}): {}", e, self.ocean.url));
        }

        if self.ocean.network.trim().is_empty() {
            errors.push("ocean.network must not be empty".to_string());
        }

        if self.ocean.timeout_secs == 0 {
            errors.push("ocean.timeout_secs must be positive".to_string());
        }

        match &self.signer {
            Some(signer) => {
                if let Err(e) = Url::parse(&signer.url) {
                    errors.push(format!("signer.url is not a valid URL ({}): {}", e, signer.url));
                }
                if signer.secret.is_empty() {
                    errors.push("signer.secret must not be empty".to_string());
                }
            }
            None if !self.dry_run.enabled => {
                errors.push("a [signer] section is required unless dry_run.enabled is set".to_string());
            }
            None => {}
        }

        if let Some(telegram) = &self.telegram {
            if telegram.token.is_empty() || telegram.chat_id.is_empty() {
                errors.push("telegram.token and telegram.chat_id must both be set".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// [`validate`](Self::validate), logging each problem and reporting a
    /// failed run when there are any
    pub fn validated(self) -> Result<Self, ExecutionResult> {
        match self.validate() {
            Ok(()) => Ok(self),
            Err(errors) => {
                for e in &errors {
                    error!("config: {}", e);
                }
                Err(ExecutionResult::failure(ControlError::Configuration.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minimal() -> AppConfig {
        AppConfig {
            settings: Settings {
                min_collateral_ratio: dec!(170),
                max_collateral_ratio: dec!(200),
                lm_token: "GLD".to_string(),
                vault: "vault".to_string(),
                address: "df1qowner".to_string(),
                reinvest_threshold: None,
                param_postfix: String::new(),
            },
            ocean: OceanConfig::default(),
            telegram: None,
            signer: None,
            dry_run: DryRunConfig { enabled: true },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn dry_run_without_signer_is_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn live_mode_requires_signer() {
        let mut config = minimal();
        config.dry_run.enabled = false;
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("[signer]")));
    }

    #[test]
    fn invalid_config_becomes_failed_run() {
        let mut config = minimal();
        config.dry_run.enabled = false;
        let result = config.validated().unwrap_err();
        assert_eq!(result.status_code, 500);
        assert_eq!(
            result.message.as_deref(),
            Some("Configuration error. please check your values")
        );

        assert!(minimal().validated().is_ok());
    }

    #[test]
    fn missing_settings_section_becomes_failed_run() {
        let dir = std::env::temp_dir().join(format!("vault-maxi-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let err = AppConfig::load_from(&dir).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();

        let result = ExecutionResult::from(&crate::error::MaxiError::from(err));
        assert!(!result.is_success());
        assert!(result
            .message
            .unwrap()
            .starts_with("Error: Configuration error:"));
    }

    #[test]
    fn bad_urls_are_reported() {
        let mut config = minimal();
        config.ocean.url = "not a url".to_string();
        config.signer = Some(SignerConfig {
            url: "also bad".to_string(),
            api_key: "key".to_string(),
            secret: String::new(),
            timeout_secs: 10,
        });
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn loads_toml_from_directory() {
        let dir = std::env::temp_dir().join(format!("vault-maxi-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            r#"
[settings]
min_collateral_ratio = 175
max_collateral_ratio = 190
lm_token = "TSLA"
vault = "abcdef0123"

[dry_run]
enabled = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.settings.min_collateral_ratio, dec!(175));
        assert_eq!(config.settings.lm_token, "TSLA");
        assert_eq!(config.ocean.network, "mainnet");
        assert!(config.is_dry_run());
        assert_eq!(config.logging.level, "info");
    }
}
