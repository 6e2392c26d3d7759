use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest allowed gap between the band edges, in ratio points
pub const MIN_BAND_WIDTH: Decimal = Decimal::TWO;

/// Operator configuration for one vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Lower edge of the target collateral ratio band (percent)
    pub min_collateral_ratio: Decimal,
    /// Upper edge of the target collateral ratio band (percent)
    pub max_collateral_ratio: Decimal,
    /// Reward token paired with DUSD for liquidity mining
    #[serde(alias = "LMToken")]
    pub lm_token: String,
    /// Vault identifier
    pub vault: String,
    /// Owner address of the vault
    #[serde(default)]
    pub address: String,
    /// Minimum reward amount worth reinvesting (absent or <= 0 disables reinvest)
    #[serde(default)]
    pub reinvest_threshold: Option<Decimal>,
    /// Label suffix, display only
    #[serde(default)]
    pub param_postfix: String,
}

impl Settings {
    /// Apply an event-supplied patch, leaving `self` untouched.
    pub fn merged(&self, overrides: Option<&SettingsOverride>) -> Settings {
        let mut merged = self.clone();
        if let Some(patch) = overrides {
            if let Some(min) = patch.min_collateral_ratio {
                merged.min_collateral_ratio = min;
            }
            if let Some(max) = patch.max_collateral_ratio {
                merged.max_collateral_ratio = max;
            }
            if let Some(token) = &patch.lm_token {
                merged.lm_token = token.clone();
            }
        }
        merged
    }

    pub fn band(&self) -> RatioBand {
        RatioBand::new(self.min_collateral_ratio, self.max_collateral_ratio)
    }

    /// Reinvest threshold, if reinvesting is enabled
    pub fn reinvest_threshold(&self) -> Option<Decimal> {
        self.reinvest_threshold.filter(|t| *t > Decimal::ZERO)
    }

    /// Pool pair symbol used for liquidity mining (e.g. "GLD-DUSD")
    pub fn lm_pair(&self) -> String {
        format!("{}-DUSD", self.lm_token)
    }

    /// Prefix for operator messages: `[Maxi<postfix> <vault id head>]`
    pub fn message_prefix(&self) -> String {
        let vault = if self.vault.len() > 6 {
            self.vault.chars().take(6).collect::<String>()
        } else {
            "...".to_string()
        };
        format!("[Maxi{} {}]", self.param_postfix, vault)
    }
}

/// Partial settings patch carried by an invocation event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_collateral_ratio: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_collateral_ratio: Option<Decimal>,
    #[serde(
        default,
        rename = "LMToken",
        alias = "lmToken",
        skip_serializing_if = "Option::is_none"
    )]
    pub lm_token: Option<String>,
}

/// Target collateral ratio band `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl RatioBand {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    /// Ratio the exposure actions aim for
    pub fn target(&self) -> Decimal {
        (self.min + self.max) / Decimal::TWO
    }

    pub fn contains(&self, ratio: Decimal) -> bool {
        ratio >= self.min && ratio <= self.max
    }

    /// Band problems, if any
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.min <= Decimal::ZERO {
            errors.push(format!("min collateral ratio must be positive: {}", self.min));
        }

        if self.max - self.min < MIN_BAND_WIDTH {
            errors.push(format!(
                "max collateral ratio {} must be at least {} above min {}",
                self.max, MIN_BAND_WIDTH, self.min
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl fmt::Display for RatioBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.min.normalize(), self.max.normalize())
    }
}
