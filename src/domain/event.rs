use serde::{Deserialize, Serialize};

use super::SettingsOverride;
use crate::error::MaxiError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_ERROR: u16 = 500;

/// Invocation input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxiEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_settings: Option<SettingsOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_setup: Option<bool>,
}

impl MaxiEvent {
    pub fn setup_check() -> Self {
        Self {
            override_settings: None,
            check_setup: Some(true),
        }
    }

    pub fn wants_setup_check(&self) -> bool {
        self.check_setup.unwrap_or(false)
    }
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecutionResult {
    pub fn success() -> Self {
        Self {
            status_code: STATUS_OK,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_ERROR,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

impl From<&MaxiError> for ExecutionResult {
    fn from(err: &MaxiError) -> Self {
        Self::failure(err.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_event_uses_stored_settings() {
        let event: MaxiEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(event, MaxiEvent::default());
        assert!(!event.wants_setup_check());
    }

    #[test]
    fn full_event_parses() {
        let event: MaxiEvent = serde_json::from_str(
            r#"{"overrideSettings": {"maxCollateralRatio": 210}, "checkSetup": true}"#,
        )
        .unwrap();
        assert!(event.wants_setup_check());
        let patch = event.override_settings.unwrap();
        assert_eq!(patch.max_collateral_ratio, Some(dec!(210)));
        assert_eq!(patch.min_collateral_ratio, None);
    }

    #[test]
    fn result_serializes_status_code() {
        let ok = serde_json::to_string(&ExecutionResult::success()).unwrap();
        assert_eq!(ok, r#"{"statusCode":200}"#);

        let failed = serde_json::to_value(ExecutionResult::failure("boom")).unwrap();
        assert_eq!(failed["statusCode"], 500);
        assert_eq!(failed["message"], "boom");
    }
}
