//! One invocation of the vault maxi: load settings, guard, decide, act, report.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::check::{build_current_settings_into_message, can_do_check};
use super::decision::{check_vault, decide, Action};
use super::traits::{ExposureProgram, NotificationChannel, ProgramFactory, SettingsStore};
use crate::domain::{CollateralRatio, ExecutionResult, MaxiEvent, Settings, Vault};
use crate::error::{ControlError, MaxiError, Result};

/// Entry point owning the rebalancing policy for a single vault
pub struct ControlLoop {
    store: Arc<dyn SettingsStore>,
    factory: Arc<dyn ProgramFactory>,
}

/// What a completed normal run did
#[derive(Debug, Clone, PartialEq)]
struct RunReport {
    action: Action,
    success: bool,
    exposure_changed: bool,
}

impl ControlLoop {
    pub fn new(store: Arc<dyn SettingsStore>, factory: Arc<dyn ProgramFactory>) -> Self {
        Self { store, factory }
    }

    /// Run once. Never fails: every problem becomes a notification plus a 500 result.
    pub async fn run(&self, event: Option<MaxiEvent>) -> ExecutionResult {
        info!("vault maxi v{}", env!("CARGO_PKG_VERSION"));

        let stored = match self.store.fetch_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Could not load settings: {}", e);
                return ExecutionResult::failure(e.user_message());
            }
        };

        let event = event.unwrap_or_default();
        if event != MaxiEvent::default() {
            match serde_json::to_string(&event) {
                Ok(json) => info!("received event {}", json),
                Err(_) => info!("received event {:?}", event),
            }
        }

        let settings = stored.merged(event.override_settings.as_ref());
        let channel = self.factory.notification_channel(&settings);

        if event.wants_setup_check() {
            return self.run_setup_check(&settings, channel.as_ref()).await;
        }

        match self.run_maxi(&settings, channel.as_ref()).await {
            Ok(report) => {
                info!(
                    "run finished: action={} success={} changed={}",
                    report.action, report.success, report.exposure_changed
                );
                ExecutionResult::success()
            }
            Err(e) => {
                let message = e.user_message();
                error!("{}", message);
                channel.send(&message).await;
                ExecutionResult::failure(message)
            }
        }
    }

    async fn run_setup_check(
        &self,
        settings: &Settings,
        channel: &dyn NotificationChannel,
    ) -> ExecutionResult {
        if !can_do_check(settings) {
            let message = build_current_settings_into_message(settings);
            info!("{}", message);
            channel.log(&message).await;
            channel.send(&message).await;
            return ExecutionResult::failure(message);
        }

        let outcome: Result<()> = async {
            let mut program = self.factory.check_program(settings)?;
            program.init().await?;
            program.report_check(channel).await
        }
        .await;

        match outcome {
            Ok(()) => ExecutionResult::success(),
            Err(e) => {
                let message = e.user_message();
                error!("setup check failed: {}", message);
                channel.send(&message).await;
                ExecutionResult::failure(message)
            }
        }
    }

    async fn run_maxi(
        &self,
        settings: &Settings,
        channel: &dyn NotificationChannel,
    ) -> Result<RunReport> {
        let mut program = self.factory.exposure_program(settings)?;
        program.init().await?;

        if !program.is_valid().await? {
            return Err(ControlError::Configuration.into());
        }

        let vault = program
            .get_vault()
            .await?
            .ok_or_else(|| ControlError::VaultNotFound {
                vault_id: settings.vault.clone(),
            })?;

        if let Err(e) = check_vault(&vault) {
            warn!(
                "vault {} rejected: state={} collateral={}",
                vault.id, vault.state, vault.collateral_value
            );
            return Err(e.into());
        }

        let next_ratio = program.next_collateral_ratio(&vault);
        let band = settings.band();
        info!(
            "starting with {} (next: {}) in vault, target {} token {}",
            vault.collateral_ratio, next_ratio, band, settings.lm_token
        );

        let action = decide(vault.collateral_ratio, next_ratio, &band);
        let (success, exposure_changed) = match action {
            Action::DecreaseExposure => (program.decrease_exposure(&vault, channel).await?, true),
            Action::IncreaseExposure => (program.increase_exposure(&vault, channel).await?, true),
            Action::Reinvest => (true, program.check_and_do_reinvest(&vault, channel).await?),
        };

        let after = refetch_vault(program.as_ref()).await;
        let message = if exposure_changed {
            changed_report(success, &vault, next_ratio, after.as_ref(), program.as_ref())
        } else {
            unchanged_report(&vault, next_ratio, after.as_ref(), program.as_ref())
        };
        info!("{}", message);
        channel.log(&message).await;

        if !success {
            return Err(MaxiError::Control(ControlError::ExecutionFailure { action }));
        }

        Ok(RunReport {
            action,
            success,
            exposure_changed,
        })
    }
}

async fn refetch_vault(program: &dyn ExposureProgram) -> Option<Vault> {
    match program.get_vault().await {
        Ok(Some(vault)) => Some(vault),
        Ok(None) => {
            warn!("vault disappeared after the action");
            None
        }
        Err(e) => {
            warn!("could not re-read vault after the action: {}", e);
            None
        }
    }
}

fn ratio_pair(vault: Option<&Vault>, program: &dyn ExposureProgram) -> (String, String) {
    match vault {
        Some(v) => (
            v.collateral_ratio.to_string(),
            program.next_collateral_ratio(v).to_string(),
        ),
        None => ("unknown".to_string(), "unknown".to_string()),
    }
}

fn changed_report(
    success: bool,
    before: &Vault,
    before_next: CollateralRatio,
    after: Option<&Vault>,
    program: &dyn ExposureProgram,
) -> String {
    let (ratio, next) = ratio_pair(after, program);
    format!(
        "executed script {}. vault ratio changed from {} (next {}) to {} (next {})",
        if success { "successfully" } else { "with problems" },
        before.collateral_ratio,
        before_next,
        ratio,
        next
    )
}

fn unchanged_report(
    before: &Vault,
    before_next: CollateralRatio,
    after: Option<&Vault>,
    program: &dyn ExposureProgram,
) -> String {
    let (ratio, next) = match after {
        Some(_) => ratio_pair(after, program),
        None => (before.collateral_ratio.to_string(), before_next.to_string()),
    };
    format!("executed script without changes. vault ratio {} next {}", ratio, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoanScheme, SettingsOverride, VaultState};
    use crate::strategy::traits::{CheckProgram, MockSettingsStore};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    fn settings() -> Settings {
        Settings {
            min_collateral_ratio: dec!(170),
            max_collateral_ratio: dec!(200),
            lm_token: "GLD".to_string(),
            vault: "vault0123456789".to_string(),
            address: "df1qowner".to_string(),
            reinvest_threshold: None,
            param_postfix: String::new(),
        }
    }

    fn vault(ratio: CollateralRatio) -> Vault {
        Vault {
            id: "vault0123456789".to_string(),
            owner_address: "df1qowner".to_string(),
            state: VaultState::Active,
            loan_scheme: LoanScheme {
                id: "MIN150".to_string(),
                min_collateral_ratio: dec!(150),
                interest_rate: dec!(5),
            },
            collateral_value: dec!(1500),
            loan_value: dec!(1000),
            interest_value: Decimal::ZERO,
            collateral_ratio: ratio,
            collateral_amounts: Vec::new(),
            loan_amounts: Vec::new(),
        }
    }

    #[derive(Default)]
    struct Recorded {
        calls: Mutex<Vec<String>>,
        settings_seen: Mutex<Option<Settings>>,
        sent: Mutex<Vec<String>>,
        logged: Mutex<Vec<String>>,
    }

    struct ScriptedProgram {
        recorded: Arc<Recorded>,
        vaults: Mutex<Vec<Option<Vault>>>,
        next: CollateralRatio,
    }

    #[async_trait]
    impl ExposureProgram for ScriptedProgram {
        async fn init(&mut self) -> Result<()> {
            Ok(())
        }
        async fn is_valid(&self) -> Result<bool> {
            Ok(true)
        }
        async fn get_vault(&self) -> Result<Option<Vault>> {
            let mut vaults = self.vaults.lock().unwrap();
            Ok(if vaults.len() > 1 {
                vaults.remove(0)
            } else {
                vaults[0].clone()
            })
        }
        fn next_collateral_ratio(&self, _vault: &Vault) -> CollateralRatio {
            self.next
        }
        async fn decrease_exposure(&self, _: &Vault, _: &dyn NotificationChannel) -> Result<bool> {
            self.recorded.calls.lock().unwrap().push("decrease".into());
            Ok(true)
        }
        async fn increase_exposure(&self, _: &Vault, _: &dyn NotificationChannel) -> Result<bool> {
            self.recorded.calls.lock().unwrap().push("increase".into());
            Ok(false)
        }
        async fn check_and_do_reinvest(
            &self,
            _: &Vault,
            _: &dyn NotificationChannel,
        ) -> Result<bool> {
            self.recorded.calls.lock().unwrap().push("reinvest".into());
            Ok(false)
        }
    }

    struct RecordingChannel(Arc<Recorded>);

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn send(&self, text: &str) {
            self.0.sent.lock().unwrap().push(text.to_string());
        }
        async fn log(&self, text: &str) {
            self.0.logged.lock().unwrap().push(text.to_string());
        }
    }

    struct ScriptedFactory {
        recorded: Arc<Recorded>,
        vaults: Vec<Option<Vault>>,
        next: CollateralRatio,
    }

    impl ProgramFactory for ScriptedFactory {
        fn notification_channel(&self, settings: &Settings) -> Arc<dyn NotificationChannel> {
            *self.recorded.settings_seen.lock().unwrap() = Some(settings.clone());
            Arc::new(RecordingChannel(self.recorded.clone()))
        }
        fn exposure_program(&self, _settings: &Settings) -> Result<Box<dyn ExposureProgram>> {
            Ok(Box::new(ScriptedProgram {
                recorded: self.recorded.clone(),
                vaults: Mutex::new(self.vaults.clone()),
                next: self.next,
            }))
        }
        fn check_program(&self, _settings: &Settings) -> Result<Box<dyn CheckProgram>> {
            Err(MaxiError::Internal("no check program".into()))
        }
    }

    fn store_returning(settings: Settings) -> Arc<MockSettingsStore> {
        let mut store = MockSettingsStore::new();
        store
            .expect_fetch_settings()
            .times(1)
            .returning(move || Ok(settings.clone()));
        Arc::new(store)
    }

    #[tokio::test]
    async fn decrease_reports_ratio_change() {
        let recorded = Arc::new(Recorded::default());
        let factory = ScriptedFactory {
            recorded: recorded.clone(),
            vaults: vec![
                Some(vault(CollateralRatio::Ratio(dec!(150)))),
                Some(vault(CollateralRatio::Ratio(dec!(185)))),
            ],
            next: CollateralRatio::Ratio(dec!(140)),
        };
        let control = ControlLoop::new(store_returning(settings()), Arc::new(factory));

        let result = control.run(None).await;

        assert!(result.is_success());
        assert_eq!(*recorded.calls.lock().unwrap(), vec!["decrease".to_string()]);
        let logged = recorded.logged.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert!(
            logged[0].contains("from 150 (next 140) to 185"),
            "unexpected report: {}",
            logged[0]
        );
    }

    #[tokio::test]
    async fn failed_action_yields_500_and_notification() {
        let recorded = Arc::new(Recorded::default());
        let factory = ScriptedFactory {
            recorded: recorded.clone(),
            vaults: vec![Some(vault(CollateralRatio::NoDebt))],
            next: CollateralRatio::NoDebt,
        };
        let control = ControlLoop::new(store_returning(settings()), Arc::new(factory));

        let result = control.run(None).await;

        assert_eq!(result.status_code, 500);
        assert_eq!(*recorded.calls.lock().unwrap(), vec!["increase".to_string()]);
        assert!(recorded.logged.lock().unwrap()[0].starts_with("executed script with problems"));
        assert_eq!(
            *recorded.sent.lock().unwrap(),
            vec!["Error: increase_exposure executed with problems".to_string()]
        );
    }

    #[tokio::test]
    async fn overrides_reach_the_collaborators() {
        let recorded = Arc::new(Recorded::default());
        let factory = ScriptedFactory {
            recorded: recorded.clone(),
            vaults: vec![Some(vault(CollateralRatio::Ratio(dec!(180))))],
            next: CollateralRatio::Ratio(dec!(175)),
        };
        let control = ControlLoop::new(store_returning(settings()), Arc::new(factory));
        let event = MaxiEvent {
            override_settings: Some(SettingsOverride {
                max_collateral_ratio: Some(dec!(250)),
                ..Default::default()
            }),
            check_setup: None,
        };

        let result = control.run(Some(event)).await;

        assert!(result.is_success());
        let seen = recorded.settings_seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.max_collateral_ratio, dec!(250));
        assert_eq!(seen.min_collateral_ratio, dec!(170));
        assert_eq!(seen.lm_token, "GLD");
        assert_eq!(
            recorded.logged.lock().unwrap()[0],
            "executed script without changes. vault ratio 180 next 175"
        );
    }

    #[tokio::test]
    async fn settings_failure_is_contained() {
        let mut store = MockSettingsStore::new();
        store
            .expect_fetch_settings()
            .times(1)
            .returning(|| Err(MaxiError::Validation("missing settings".into())));
        let recorded = Arc::new(Recorded::default());
        let factory = ScriptedFactory {
            recorded: recorded.clone(),
            vaults: vec![None],
            next: CollateralRatio::NoDebt,
        };
        let control = ControlLoop::new(Arc::new(store), Arc::new(factory));

        let result = control.run(None).await;

        assert_eq!(result.status_code, 500);
        assert!(recorded.calls.lock().unwrap().is_empty());
        assert!(recorded.settings_seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn incomplete_settings_block_setup_check() {
        let mut incomplete = settings();
        incomplete.address = String::new();
        let recorded = Arc::new(Recorded::default());
        let factory = ScriptedFactory {
            recorded: recorded.clone(),
            vaults: vec![None],
            next: CollateralRatio::NoDebt,
        };
        let control = ControlLoop::new(store_returning(incomplete), Arc::new(factory));

        let result = control.run(Some(MaxiEvent::setup_check())).await;

        assert_eq!(result.status_code, 500);
        let message = result.message.unwrap();
        assert_eq!(recorded.sent.lock().unwrap().clone(), vec![message.clone()]);
        assert_eq!(recorded.logged.lock().unwrap().clone(), vec![message]);
        assert!(recorded.calls.lock().unwrap().is_empty());
    }
}
