pub mod ocean;
pub mod settings_store;
pub mod telegram;

pub use ocean::{OceanClient, PoolPairResponse, VaultResponse};
pub use settings_store::ConfigSettingsStore;
pub use telegram::{LogNotifier, TelegramNotifier};
