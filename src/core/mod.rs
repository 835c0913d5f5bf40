pub mod block;
pub mod engine;
pub mod forest;
pub mod merkle;
pub mod miner;
pub mod pow;
pub mod transaction;

pub use block::{Block, GENESIS_HASH};
pub use engine::{settle_transaction, BlockAcceptance, Engine};
pub use forest::{ChainForest, CompactBlock, InsertOutcome, LinkState};
pub use miner::{CancelToken, FoundNonce, HashJob};
pub use transaction::{Transaction, TxCommand, TxStatus};
