//! Ratio policy and pre-action guards.
//!
//! Both are pure so they can be tested without network or wallet access.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{CollateralRatio, RatioBand, Vault};
use crate::error::ControlError;

/// The single corrective action chosen for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Repay loans to restore the safety margin
    DecreaseExposure,
    /// Borrow more against idle collateral
    IncreaseExposure,
    /// Inside the band: reinvest rewards if worthwhile
    Reinvest,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::DecreaseExposure => "decrease_exposure",
            Action::IncreaseExposure => "increase_exposure",
            Action::Reinvest => "reinvest",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pick the action for the current and projected ratio.
///
/// The lower of the two readings is used, so a vault about to fall below the
/// band is handled as if it already had. A negative reading counts as no debt;
/// a zero reading is neither under nor over the band.
pub fn decide(current: CollateralRatio, next: CollateralRatio, band: &RatioBand) -> Action {
    match current.min(next) {
        CollateralRatio::NoDebt => Action::IncreaseExposure,
        CollateralRatio::Ratio(used) if used < Decimal::ZERO => Action::IncreaseExposure,
        CollateralRatio::Ratio(used) if used.is_zero() || band.contains(used) => Action::Reinvest,
        CollateralRatio::Ratio(used) if used < band.min => Action::DecreaseExposure,
        CollateralRatio::Ratio(_) => Action::IncreaseExposure,
    }
}

/// State and size checks a vault must pass before any action runs
pub fn check_vault(vault: &Vault) -> Result<(), ControlError> {
    if vault.state.blocks_actions() {
        return Err(ControlError::VaultNotActive { state: vault.state });
    }

    if !vault.has_enough_collateral() {
        return Err(ControlError::InsufficientCollateral {
            collateral_value: vault.collateral_value,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoanScheme, VaultState};
    use rust_decimal_macros::dec;

    fn ratio(v: Decimal) -> CollateralRatio {
        CollateralRatio::Ratio(v)
    }

    fn band(min: Decimal, max: Decimal) -> RatioBand {
        RatioBand::new(min, max)
    }

    fn vault(state: VaultState, collateral_value: Decimal) -> Vault {
        Vault {
            id: "vault".to_string(),
            owner_address: "owner".to_string(),
            state,
            loan_scheme: LoanScheme {
                id: "MIN150".to_string(),
                min_collateral_ratio: dec!(150),
                interest_rate: dec!(5),
            },
            collateral_value,
            loan_value: dec!(100),
            interest_value: Decimal::ZERO,
            collateral_ratio: ratio(dec!(180)),
            collateral_amounts: Vec::new(),
            loan_amounts: Vec::new(),
        }
    }

    #[test]
    fn projected_drop_below_band_decreases() {
        // current 150, next 140, band 170-200: worst case 140 is under the floor
        let action = decide(ratio(dec!(150)), ratio(dec!(140)), &band(dec!(170), dec!(200)));
        assert_eq!(action, Action::DecreaseExposure);
    }

    #[test]
    fn trend_wins_over_snapshot() {
        // current is comfortably inside, next dips below
        let action = decide(ratio(dec!(190)), ratio(dec!(165)), &band(dec!(170), dec!(200)));
        assert_eq!(action, Action::DecreaseExposure);
    }

    #[test]
    fn no_debt_increases() {
        let action = decide(
            CollateralRatio::NoDebt,
            CollateralRatio::NoDebt,
            &band(dec!(150), dec!(200)),
        );
        assert_eq!(action, Action::IncreaseExposure);
    }

    #[test]
    fn over_band_increases() {
        let action = decide(ratio(dec!(260)), ratio(dec!(240)), &band(dec!(150), dec!(200)));
        assert_eq!(action, Action::IncreaseExposure);
    }

    #[test]
    fn inside_band_reinvests() {
        let action = decide(ratio(dec!(180)), ratio(dec!(175)), &band(dec!(150), dec!(200)));
        assert_eq!(action, Action::Reinvest);
    }

    #[test]
    fn non_positive_readings() {
        let b = band(dec!(150), dec!(200));
        assert_eq!(
            decide(ratio(dec!(-1)), ratio(dec!(180)), &b),
            Action::IncreaseExposure
        );
        assert_eq!(decide(ratio(dec!(0)), ratio(dec!(180)), &b), Action::Reinvest);
        assert_eq!(decide(ratio(dec!(180)), ratio(dec!(0)), &b), Action::Reinvest);
    }

    #[test]
    fn band_edges_are_inside() {
        let b = band(dec!(150), dec!(200));
        assert_eq!(decide(ratio(dec!(150)), ratio(dec!(160)), &b), Action::Reinvest);
        assert_eq!(decide(ratio(dec!(200)), ratio(dec!(210)), &b), Action::Reinvest);
    }

    #[test]
    fn sweep_matches_band_membership() {
        let b = band(dec!(160), dec!(190));
        for current in (-10..=260).step_by(5) {
            for next in (-10..=260).step_by(7) {
                let used = Decimal::from(current.min(next));
                let expected = if used < Decimal::ZERO {
                    Action::IncreaseExposure
                } else if used.is_zero() {
                    Action::Reinvest
                } else if used < b.min {
                    Action::DecreaseExposure
                } else if used > b.max {
                    Action::IncreaseExposure
                } else {
                    Action::Reinvest
                };
                let action = decide(
                    ratio(Decimal::from(current)),
                    ratio(Decimal::from(next)),
                    &b,
                );
                assert_eq!(action, expected, "current {current} next {next}");
            }
        }
    }

    #[test]
    fn frozen_and_liquidating_vaults_are_rejected() {
        for state in [VaultState::Frozen, VaultState::InLiquidation] {
            assert_eq!(
                check_vault(&vault(state, dec!(1000))),
                Err(ControlError::VaultNotActive { state })
            );
        }
        assert!(check_vault(&vault(VaultState::Active, dec!(1000))).is_ok());
        assert!(check_vault(&vault(VaultState::MayLiquidate, dec!(1000))).is_ok());
    }

    #[test]
    fn tiny_vaults_are_rejected() {
        assert_eq!(
            check_vault(&vault(VaultState::Active, dec!(9.99))),
            Err(ControlError::InsufficientCollateral {
                collateral_value: dec!(9.99)
            })
        );
        assert!(check_vault(&vault(VaultState::Active, dec!(10))).is_ok());
    }
}
