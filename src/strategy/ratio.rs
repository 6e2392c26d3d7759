//! Projected collateral ratio and exposure sizing.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::decision::Action;
use crate::domain::{CollateralRatio, RatioBand, Vault};

/// Ratio once the next oracle prices are active, floored to whole percent.
pub fn next_collateral_ratio(vault: &Vault) -> CollateralRatio {
    let next_loan: Decimal = vault.loan_amounts.iter().map(|l| l.next_value()).sum();
    if next_loan <= Decimal::ZERO {
        return CollateralRatio::NoDebt;
    }

    let next_collateral: Decimal = vault
        .collateral_amounts
        .iter()
        .map(|c| c.next_value())
        .sum();

    let ratio = (next_collateral / next_loan * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::ToNegativeInfinity);
    CollateralRatio::Ratio(ratio)
}

/// Sizing handed to the signer for an exposure change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposurePlan {
    pub target_ratio: Decimal,
    /// Positive: borrow this much more; negative: repay
    pub loan_delta_usd: Decimal,
}

impl ExposurePlan {
    /// Loan change that brings the vault to the middle of the band.
    ///
    /// Sized from the lower of the current and projected ratio, the same reading
    /// `decide` acts on. A decrease never borrows and an increase never repays.
    pub fn for_action(
        action: Action,
        vault: &Vault,
        next: CollateralRatio,
        band: &RatioBand,
    ) -> Self {
        let target_ratio = band.target();
        if target_ratio <= Decimal::ZERO {
            return Self {
                target_ratio,
                loan_delta_usd: Decimal::ZERO,
            };
        }

        let target_loan = match vault.collateral_ratio.min(next) {
            CollateralRatio::Ratio(used)
                if used > Decimal::ZERO && vault.loan_value > Decimal::ZERO =>
            {
                vault.loan_value * used / target_ratio
            }
            _ => vault.collateral_value * Decimal::ONE_HUNDRED / target_ratio,
        };

        let delta = (target_loan - vault.loan_value).round_dp(8);
        let loan_delta_usd = match action {
            Action::DecreaseExposure => delta.min(Decimal::ZERO),
            Action::IncreaseExposure => delta.max(Decimal::ZERO),
            Action::Reinvest => delta,
        };

        Self {
            target_ratio,
            loan_delta_usd,
        }
    }

    pub fn is_repay(&self) -> bool {
        self.loan_delta_usd < Decimal::ZERO
    }
}
