pub mod signer;
pub mod wallet;

pub use signer::{ActionReceipt, ActionRequest, SignerClient};
pub use wallet::WalletGateway;
