use crate::core::merkle::merkle_root;
use crate::core::miner::{search_nonce, CancelToken, HashJob};
use crate::core::pow::{block_hash, block_hash_preimage, check_proof_of_work};
use crate::core::transaction::Transaction;
use crate::storage::Account;
use log::info;
use serde::{Deserialize, Serialize};

pub const BLOCK_VERSION: u16 = 1;

/// Placeholder previous-hash of the first mined block
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A full block: header, the transactions it settles, and the account-state
/// snapshot the state root commits to. `self_hash` stays None until the
/// proof-of-work search succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    version: u16,
    height: u32,
    previous_hash: String,
    timestamp: i64,
    difficulty: u16,
    nonce: i64,
    merkle_root_hash: String,
    state_root_hash: String,
    self_hash: Option<String>,
    transactions: Vec<Transaction>,
    account_snapshot: Vec<Account>,
}

impl Block {
    /// Assemble an unhashed candidate block. Both Merkle roots are computed
    /// here; the nonce and self hash come later from the miner.
    pub fn new(
        height: u32,
        previous_hash: String,
        timestamp: i64,
        transactions: Vec<Transaction>,
        account_snapshot: Vec<Account>,
        difficulty: u16,
    ) -> Block {
        let tx_hashes: Vec<String> = transactions
            .iter()
            .map(|tx| tx.get_hash().to_string())
            .collect();
        let state_digests: Vec<String> = account_snapshot
            .iter()
            .map(|account| account.state_digest())
            .collect();

        Block {
            version: BLOCK_VERSION,
            height,
            previous_hash,
            timestamp,
            difficulty,
            nonce: -1,
            merkle_root_hash: merkle_root(&tx_hashes),
            state_root_hash: merkle_root(&state_digests),
            self_hash: None,
            transactions,
            account_snapshot,
        }
    }

    /// Rebuild a block from fields that arrived over the wire or came out of
    /// the block log. The claimed self hash is kept; callers verify it.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        version: u16,
        height: u32,
        previous_hash: String,
        timestamp: i64,
        difficulty: u16,
        nonce: i64,
        merkle_root_hash: String,
        state_root_hash: String,
        self_hash: String,
        transactions: Vec<Transaction>,
    ) -> Block {
        Block {
            version,
            height,
            previous_hash,
            timestamp,
            difficulty,
            nonce,
            merkle_root_hash,
            state_root_hash,
            self_hash: Some(self_hash),
            transactions,
            account_snapshot: Vec::new(),
        }
    }

    /// Header preimage without the nonce; the miner appends nonces to this.
    pub fn hash_preimage(&self) -> String {
        block_hash_preimage(
            self.version,
            self.height,
            &self.previous_hash,
            &self.merkle_root_hash,
            self.timestamp,
            self.difficulty,
        )
    }

    /// Run the worker-pool search for this block's nonce. Returns the self
    /// hash on success; None means the job was cancelled or race-lost and
    /// the block must be abandoned.
    pub fn compute_self_hash(
        &mut self,
        worker_count: usize,
        cancel: &CancelToken,
        race_lost: impl Fn() -> bool,
    ) -> Option<String> {
        let job = HashJob {
            preimage: self.hash_preimage(),
            difficulty: self.difficulty,
            height: self.height,
        };

        info!(
            "Starting hash search for height {} (difficulty {}, {} transactions)",
            self.height,
            self.difficulty,
            self.transactions.len()
        );

        let found = search_nonce(&job, worker_count, cancel, race_lost)?;
        self.nonce = found.nonce;
        self.self_hash = Some(found.hash.clone());
        Some(found.hash)
    }

    /// Recompute the header hash from the block's own fields and check it
    /// against the claimed self hash and the difficulty rule.
    pub fn verify_self_hash(&self) -> bool {
        let claimed = match &self.self_hash {
            Some(hash) => hash,
            None => return false,
        };
        let recomputed = block_hash(&self.hash_preimage(), self.nonce);
        recomputed == *claimed && check_proof_of_work(claimed, self.difficulty)
    }

    pub fn get_version(&self) -> u16 {
        self.version
    }

    pub fn get_height(&self) -> u32 {
        self.height
    }

    pub fn get_previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_difficulty(&self) -> u16 {
        self.difficulty
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn get_merkle_root(&self) -> &str {
        &self.merkle_root_hash
    }

    pub fn get_state_root(&self) -> &str {
        &self.state_root_hash
    }

    pub fn get_hash(&self) -> Option<&str> {
        self.self_hash.as_deref()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get_account_snapshot(&self) -> &[Account] {
        &self.account_snapshot
    }
}
