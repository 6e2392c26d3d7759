use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MaxiError, Result};

/// Minimum collateral value (USD) a vault needs before the bot touches it
pub const MIN_COLLATERAL_VALUE_USD: Decimal = Decimal::TEN;

/// Loan vault state as reported by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultState {
    Active,
    Frozen,
    MayLiquidate,
    InLiquidation,
    Unknown,
}

impl VaultState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultState::Active => "ACTIVE",
            VaultState::Frozen => "FROZEN",
            VaultState::MayLiquidate => "MAY_LIQUIDATE",
            VaultState::InLiquidation => "IN_LIQUIDATION",
            VaultState::Unknown => "UNKNOWN",
        }
    }

    /// Frozen and liquidating vaults must not be touched
    pub fn blocks_actions(&self) -> bool {
        matches!(self, VaultState::Frozen | VaultState::InLiquidation)
    }
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for VaultState {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(VaultState::Active),
            "FROZEN" => Ok(VaultState::Frozen),
            "MAY_LIQUIDATE" => Ok(VaultState::MayLiquidate),
            "IN_LIQUIDATION" => Ok(VaultState::InLiquidation),
            "UNKNOWN" => Ok(VaultState::Unknown),
            _ => Err(format!("Unknown vault state: {}", s)),
        }
    }
}

/// Collateral ratio of a vault.
///
/// The protocol reports a vault without loans with a ratio of `-1`; that case is
/// kept as its own variant instead of a magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollateralRatio {
    /// Vault has no outstanding loan
    NoDebt,
    /// Collateral value over loan value, in percent
    Ratio(Decimal),
}

impl CollateralRatio {
    /// Interpret a raw protocol reading.
    ///
    /// A non-positive reading only means "no debt" when the loan value is zero
    /// as well; anything else is inconsistent data.
    pub fn from_raw(raw: Decimal, loan_value: Decimal) -> Result<Self> {
        if raw > Decimal::ZERO {
            return Ok(CollateralRatio::Ratio(raw));
        }
        if loan_value <= Decimal::ZERO {
            return Ok(CollateralRatio::NoDebt);
        }
        Err(MaxiError::InvalidVaultData(format!(
            "collateral ratio {} reported for a vault with loan value {}",
            raw, loan_value
        )))
    }

    /// The more pessimistic of two readings. A missing loan sorts below every ratio.
    pub fn min(self, other: CollateralRatio) -> CollateralRatio {
        match (self, other) {
            (CollateralRatio::Ratio(a), CollateralRatio::Ratio(b)) => {
                CollateralRatio::Ratio(a.min(b))
            }
            _ => CollateralRatio::NoDebt,
        }
    }
}

impl fmt::Display for CollateralRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollateralRatio::NoDebt => write!(f, "-1"),
            CollateralRatio::Ratio(v) => write!(f, "{}", v.normalize()),
        }
    }
}

/// Loan scheme the vault is bound to
#[derive(Debug, Clone, PartialEq)]
pub struct LoanScheme {
    pub id: String,
    /// Protocol liquidation threshold, in percent
    pub min_collateral_ratio: Decimal,
    pub interest_rate: Decimal,
}

/// Token amount held as collateral or owed as loan
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAmount {
    pub symbol: String,
    pub amount: Decimal,
    /// Current oracle price; `None` for tokens pegged to 1 USD (DUSD)
    pub active_price: Option<Decimal>,
    /// Next oracle price; `None` for tokens pegged to 1 USD (DUSD)
    pub next_price: Option<Decimal>,
}

impl TokenAmount {
    /// USD value at the next oracle price
    pub fn next_value(&self) -> Decimal {
        self.amount * self.next_price.unwrap_or(Decimal::ONE)
    }
}

/// Snapshot of a loan vault
#[derive(Debug, Clone, PartialEq)]
pub struct Vault {
    pub id: String,
    pub owner_address: String,
    pub state: VaultState,
    pub loan_scheme: LoanScheme,
    /// Collateral value in USD
    pub collateral_value: Decimal,
    /// Loan value in USD, interest included
    pub loan_value: Decimal,
    pub interest_value: Decimal,
    pub collateral_ratio: CollateralRatio,
    pub collateral_amounts: Vec<TokenAmount>,
    pub loan_amounts: Vec<TokenAmount>,
}

impl Vault {
    pub fn has_enough_collateral(&self) -> bool {
        self.collateral_value >= MIN_COLLATERAL_VALUE_USD
    }

    pub fn is_owned_by(&self, address: &str) -> bool {
        !address.is_empty() && self.owner_address == address
    }
}
