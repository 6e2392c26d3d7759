pub mod check;
pub mod control_loop;
pub mod decision;
pub mod factory;
pub mod ratio;
pub mod traits;
pub mod vault_maxi;

pub use check::{build_current_settings_into_message, can_do_check, SetupCheckProgram, SetupReport};
pub use control_loop::ControlLoop;
pub use decision::{check_vault, decide, Action};
pub use factory::LiveProgramFactory;
pub use ratio::{next_collateral_ratio, ExposurePlan};
pub use traits::{CheckProgram, ExposureProgram, NotificationChannel, ProgramFactory, SettingsStore};
pub use vault_maxi::VaultMaxiProgram;
