//! # Embercoin
//!
//! A single-node participant in a proof-of-work cryptocurrency network with
//! an account-balance ledger.
//!
//! ## Layout
//! - `core/`: blocks, transactions, the hash-search worker pool, the chain
//!   forest, and the settlement engine
//! - `storage/`: the sled-backed account ledger and indexes, plus the
//!   rotating binary block log
//! - `network/`: UDP gossip (block and transaction relay, peer exchange,
//!   paced chain replay)
//! - `wallet/`: ECDSA P-256 key management and the encrypted keystore
//! - `config/`: the JSON node configuration
//! - `utils/`: hashing, signing, and serialization helpers
//! - `cli/`: command-line interface for the node binary

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use cli::{Command, Opt};
pub use config::Settings;
pub use core::{
    settle_transaction, Block, BlockAcceptance, CancelToken, ChainForest, CompactBlock, Engine,
    Transaction, TxCommand, TxStatus, GENESIS_HASH,
};
pub use error::{NodeError, Result};
pub use network::{GossipNode, PeerSet, UdpTransport};
pub use storage::{Account, AccountStore, BlockLog, BlockRecord, LedgerStage};
pub use utils::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    floor_to_fee_precision, new_key_pair, ripemd160_digest, sha256_digest, sha256_hex,
};
pub use wallet::Wallet;
