pub mod keystore;
pub mod wallet;

pub use keystore::{load_or_create, load_wallet, save_wallet};
pub use wallet::Wallet;
