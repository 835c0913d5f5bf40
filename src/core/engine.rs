// The ledger engine: owns the transaction pool, the chain forest, the
// settlement pipeline, and block production. Network handlers share it behind
// an Arc; interior locks keep gossip responsive while a block is being mined.

use crate::core::block::{Block, GENESIS_HASH};
use crate::core::forest::{ChainForest, CompactBlock, InsertOutcome};
use crate::core::miner::CancelToken;
use crate::core::pow::{coinbase_reward, COINBASE_MATURITY};
use crate::core::transaction::{Transaction, TxCommand, TxStatus};
use crate::error::{NodeError, Result};
use crate::storage::{
    encode_record, Account, AccountStore, BlockIndex, BlockLocation, BlockLog, BlockRecord,
    LedgerStage, LogPosition, TxIndex,
};
use crate::utils::{current_timestamp, floor_to_fee_precision, mean};
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Instant;

/// Samples collected before the difficulty is reconsidered
const RETARGET_WINDOW: usize = 100;
/// Mean mining duration (seconds) above which difficulty steps down
const RETARGET_SLOW_SECS: f64 = 60.0;
/// Mean mining duration (seconds) below which difficulty steps up
const RETARGET_FAST_SECS: f64 = 15.0;
/// Forks whose tip falls this far behind the main chain are dropped
const FORK_PRUNE_DEPTH: u32 = 10;

/// What happened to a block offered by a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAcceptance {
    /// Extended the main chain; ledger mutated
    Extended,
    /// Entered the forest as (part of) a fork; no ledger mutation
    Forked,
    /// Hash already known; dropped
    AlreadyKnown,
}

/// Pending transactions plus the in-flight set of hashes currently being
/// mined into a candidate block. An in-flight hash cannot re-enter the pool.
#[derive(Default)]
struct TxPool {
    pending: Vec<Transaction>,
    in_flight: HashSet<String>,
}

struct Tuning {
    difficulty: u16,
    /// Rolling mining-duration window, seconds per produced block
    window: Vec<i64>,
}

pub struct Engine {
    accounts: AccountStore,
    block_index: BlockIndex,
    tx_index: TxIndex,
    block_log: BlockLog,
    forest: RwLock<ChainForest>,
    pool: Mutex<TxPool>,
    tuning: Mutex<Tuning>,
    log_tail: Mutex<LogPosition>,
    fee_rate: f64,
}

impl Engine {
    /// Open the engine over an existing datastore, rebuilding the forest and
    /// the log tail from the block index.
    pub fn open(
        db: &sled::Db,
        log_dir: &Path,
        fee_rate: f64,
        initial_difficulty: u16,
    ) -> Result<Engine> {
        let accounts = AccountStore::open(db)?;
        let block_index = BlockIndex::open(db)?;
        let tx_index = TxIndex::open(db)?;
        let block_log = BlockLog::open(log_dir)?;

        // Walk every indexed location, forks included. The tail must land on
        // the last written record or the next append clobbers it.
        let mut forest = ChainForest::new();
        let mut tail: Option<LogPosition> = None;
        let locations = block_index.all()?;
        for location in &locations {
            let record = block_log.read_at(location.file_id, location.offset)?;
            let block_hash = record.block.get_hash().unwrap_or_default().to_string();
            forest.insert(CompactBlock::new(
                &block_hash,
                record.block.get_height(),
                record.block.get_previous_hash(),
            ));
            let candidate = LogPosition {
                file_id: location.file_id,
                offset: location.offset,
                size: location.size,
            };
            let is_later = match tail {
                Some(current) => {
                    (candidate.file_id, candidate.offset) >= (current.file_id, current.offset)
                }
                None => true,
            };
            if is_later {
                tail = Some(candidate);
            }
        }
        let log_tail = tail.unwrap_or_else(LogPosition::origin);
        if !locations.is_empty() {
            info!(
                "Rebuilt chain state: height {}, log tail at file {} offset {}",
                forest.main_height(),
                log_tail.file_id,
                log_tail.offset
            );
        }

        Ok(Engine {
            accounts,
            block_index,
            tx_index,
            block_log,
            forest: RwLock::new(forest),
            pool: Mutex::new(TxPool::default()),
            tuning: Mutex::new(Tuning {
                difficulty: initial_difficulty,
                window: Vec::with_capacity(RETARGET_WINDOW),
            }),
            log_tail: Mutex::new(log_tail),
            fee_rate,
        })
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_rate
    }

    pub fn chain_height(&self) -> u32 {
        self.forest
            .read()
            .expect("Failed to acquire read lock on chain forest")
            .main_height()
    }

    pub fn current_difficulty(&self) -> u16 {
        self.tuning
            .lock()
            .expect("Failed to acquire lock on difficulty state")
            .difficulty
    }

    pub fn pending_count(&self) -> usize {
        self.pool
            .lock()
            .expect("Failed to acquire lock on transaction pool")
            .pending
            .len()
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    /// Queue a transaction for the next produced block. Duplicates of pending
    /// or in-flight hashes are dropped; settled hashes are left for the
    /// pipeline's replay check so the rejection gets recorded.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<bool> {
        let mut pool = self
            .pool
            .lock()
            .expect("Failed to acquire lock on transaction pool");
        let hash = tx.get_hash().to_string();
        if pool.in_flight.contains(&hash)
            || pool.pending.iter().any(|pending| pending.get_hash() == hash)
        {
            return Ok(false);
        }
        pool.pending.push(tx);
        Ok(true)
    }

    /// Produce and persist one block. Returns None when the hash search was
    /// cancelled or the height was taken by a peer first; the drained
    /// transactions go back to the pool in that case.
    pub fn produce_block(
        &self,
        miner_address: &str,
        worker_count: usize,
        cancel: &CancelToken,
    ) -> Result<Option<Block>> {
        let (height, previous_hash) = {
            let forest = self
                .forest
                .read()
                .expect("Failed to acquire read lock on chain forest");
            match forest.main_tip() {
                Some(tip) => (tip.height + 1, tip.block_hash.clone()),
                None => (1, GENESIS_HASH.to_string()),
            }
        };
        let difficulty = self.current_difficulty();

        let drained = {
            let mut pool = self
                .pool
                .lock()
                .expect("Failed to acquire lock on transaction pool");
            let drained: Vec<Transaction> = pool.pending.drain(..).collect();
            for tx in &drained {
                pool.in_flight.insert(tx.get_hash().to_string());
            }
            drained
        };

        // A store or log failure must hand the drained transactions back just
        // like an abandoned search does, or their hashes stay in-flight and
        // block every resubmission.
        let outcome = self.mine_candidate(
            miner_address,
            worker_count,
            cancel,
            height,
            previous_hash,
            difficulty,
            &drained,
        );
        match outcome {
            Ok(Some(block)) => {
                self.clear_in_flight(&drained);
                Ok(Some(block))
            }
            Ok(None) => {
                self.requeue(drained);
                Ok(None)
            }
            Err(e) => {
                self.requeue(drained);
                Err(e)
            }
        }
    }

    /// Settle, assemble, mine, and persist one candidate block. None means
    /// the search was cancelled or the height was lost to a peer.
    #[allow(clippy::too_many_arguments)]
    fn mine_candidate(
        &self,
        miner_address: &str,
        worker_count: usize,
        cancel: &CancelToken,
        height: u32,
        previous_hash: String,
        difficulty: u16,
        drained: &[Transaction],
    ) -> Result<Option<Block>> {
        let mut stage = LedgerStage::new(&self.accounts);
        let mut settled = Vec::with_capacity(drained.len() + 1);

        // Pay out the block that just matured, reward plus the fees it
        // collected, to whoever mined it.
        if let Some(coinbase) = self.matured_coinbase(height, &stage)? {
            settled.push(settle_transaction(
                &coinbase,
                &mut stage,
                &self.tx_index,
                self.fee_rate,
            )?);
        }
        for tx in drained {
            settled.push(settle_transaction(
                tx,
                &mut stage,
                &self.tx_index,
                self.fee_rate,
            )?);
        }

        let snapshot = stage.snapshot()?;
        let mut block = Block::new(
            height,
            previous_hash,
            current_timestamp()?,
            settled,
            snapshot,
            difficulty,
        );

        let started = Instant::now();
        let mined = block.compute_self_hash(worker_count, cancel, || {
            self.chain_height() >= height
        });
        let block_hash = match mined {
            Some(hash) => hash,
            None => return Ok(None),
        };

        // The search can win the instant a peer's block for the same height
        // lands; re-check before touching disk.
        if self
            .forest
            .read()
            .expect("Failed to acquire read lock on chain forest")
            .has_competing_tip_at(height, &block_hash)
        {
            info!("Height {height} was taken while hashing; abandoning candidate");
            return Ok(None);
        }

        self.persist_block(&block, miner_address, true, stage)?;
        self.record_mining_duration(started.elapsed().as_secs() as i64);
        info!("Produced block {block_hash} at height {height}");
        Ok(Some(block))
    }

    /// A block announced by a peer. The self hash must already be verified by
    /// the caller; this decides between extending the ledger and recording a
    /// fork.
    pub fn accept_external_block(&self, record: BlockRecord) -> Result<BlockAcceptance> {
        let block = &record.block;
        let block_hash = block
            .get_hash()
            .ok_or_else(|| NodeError::InvalidBlock("Announced block has no hash".to_string()))?
            .to_string();

        {
            let forest = self
                .forest
                .read()
                .expect("Failed to acquire read lock on chain forest");
            if forest.contains(&block_hash) {
                return Ok(BlockAcceptance::AlreadyKnown);
            }
        }

        let extends_main = {
            let forest = self
                .forest
                .read()
                .expect("Failed to acquire read lock on chain forest");
            match forest.main_tip() {
                Some(tip) => {
                    block.get_previous_hash() == tip.block_hash
                        && block.get_height() == tip.height + 1
                }
                None => block.get_previous_hash() == GENESIS_HASH && block.get_height() == 1,
            }
        };

        if !extends_main {
            // A competing block enters the forest and the log, never the
            // ledger.
            self.persist_fork_record(&record)?;
            return Ok(BlockAcceptance::Forked);
        }

        let mut stage = LedgerStage::new(&self.accounts);
        for tx in block.get_transactions() {
            settle_transaction(tx, &mut stage, &self.tx_index, self.fee_rate)?;
        }
        self.persist_block(block, &record.miner, true, stage)?;
        Ok(BlockAcceptance::Extended)
    }

    /// Every mainchain block strictly above `height`, lowest first. Feeds
    /// the paced replay a syncing peer asked for.
    pub fn mainchain_blocks_above(&self, height: u32) -> Result<Vec<BlockRecord>> {
        let top = self.chain_height();
        let mut records = Vec::new();
        for h in (height + 1)..=top {
            if let Some(location) = self.block_index.get_by_height(h)? {
                records.push(self.block_log.read_at(location.file_id, location.offset)?);
            }
        }
        Ok(records)
    }

    pub fn read_block(&self, block_hash: &str) -> Result<Option<BlockRecord>> {
        match self.block_index.get(block_hash)? {
            Some(location) => Ok(Some(
                self.block_log.read_at(location.file_id, location.offset)?,
            )),
            None => Ok(None),
        }
    }

    /// The synthetic payout for the block that matures at `height`, or None
    /// while the chain is younger than the maturity window.
    fn matured_coinbase(&self, height: u32, stage: &LedgerStage) -> Result<Option<Transaction>> {
        if height <= COINBASE_MATURITY {
            return Ok(None);
        }
        let matured_height = height - COINBASE_MATURITY;
        let location = match self.block_index.get_by_height(matured_height)? {
            Some(location) => location,
            None => return Ok(None),
        };
        let record = self.block_log.read_at(location.file_id, location.offset)?;
        let fees: f64 = record
            .block
            .get_transactions()
            .iter()
            .filter(|tx| tx.get_status() == TxStatus::Success)
            .map(|tx| tx.get_fee())
            .sum();
        let amount = coinbase_reward(matured_height) + fees;
        let nonce = stage
            .get(&record.miner)?
            .map(|account| account.nonce + 1)
            .unwrap_or(1);
        Ok(Some(Transaction::new_coinbase(&record.miner, amount, nonce)))
    }

    /// Append the record, index it, commit the staged ledger, and advance the
    /// forest. The ledger commit comes last so a failed write leaves no
    /// half-applied balances behind.
    fn persist_block(
        &self,
        block: &Block,
        miner: &str,
        mainchain: bool,
        stage: LedgerStage,
    ) -> Result<()> {
        let record = BlockRecord {
            block: block.clone(),
            miner: miner.to_string(),
            mainchain,
        };
        let block_hash = self.append_record(&record)?;

        // Positions are taken over the full transaction list so rejected
        // neighbors do not shift a settled entry's index.
        let settled_entries: Vec<(u32, String)> = block
            .get_transactions()
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.get_status() == TxStatus::Success)
            .map(|(position, tx)| (position as u32, tx.get_hash().to_string()))
            .collect();
        self.tx_index.index_block(&block_hash, &settled_entries)?;
        stage.commit()?;

        let mut forest = self
            .forest
            .write()
            .expect("Failed to acquire write lock on chain forest");
        forest.insert(CompactBlock::new(
            &block_hash,
            block.get_height(),
            block.get_previous_hash(),
        ));
        forest.prune_stale_forks(FORK_PRUNE_DEPTH);
        Ok(())
    }

    fn persist_fork_record(&self, record: &BlockRecord) -> Result<()> {
        let mut fork = record.clone();
        fork.mainchain = false;
        let block_hash = self.append_record(&fork)?;

        let mut forest = self
            .forest
            .write()
            .expect("Failed to acquire write lock on chain forest");
        let outcome = forest.insert(CompactBlock::new(
            &block_hash,
            fork.block.get_height(),
            fork.block.get_previous_hash(),
        ));
        if outcome == InsertOutcome::NewFork {
            warn!(
                "Recorded competing block {block_hash} at height {}",
                fork.block.get_height()
            );
        }
        Ok(())
    }

    /// Encode and write one record at the log tail; returns the block hash.
    fn append_record(&self, record: &BlockRecord) -> Result<String> {
        let encoded = encode_record(record)?;
        let mut tail = self
            .log_tail
            .lock()
            .expect("Failed to acquire lock on block log tail");
        let position = tail.next(encoded.len() as u32);
        self.block_log.write_at(position, &encoded)?;

        let block_hash = record
            .block
            .get_hash()
            .ok_or_else(|| NodeError::InvalidBlock("Persisting an unhashed block".to_string()))?
            .to_string();
        self.block_index.insert(&BlockLocation {
            block_hash: block_hash.clone(),
            height: record.block.get_height(),
            file_id: position.file_id,
            offset: position.offset,
            size: position.size,
            mainchain: record.mainchain,
        })?;
        *tail = position;
        Ok(block_hash)
    }

    fn requeue(&self, drained: Vec<Transaction>) {
        let mut pool = self
            .pool
            .lock()
            .expect("Failed to acquire lock on transaction pool");
        for tx in drained {
            pool.in_flight.remove(tx.get_hash());
            pool.pending.push(tx);
        }
    }

    fn clear_in_flight(&self, drained: &[Transaction]) {
        let mut pool = self
            .pool
            .lock()
            .expect("Failed to acquire lock on transaction pool");
        for tx in drained {
            pool.in_flight.remove(tx.get_hash());
        }
    }

    /// Feed one mining duration into the rolling window; once the window is
    /// full the difficulty steps at most one unit and the window resets.
    fn record_mining_duration(&self, seconds: i64) {
        let mut tuning = self
            .tuning
            .lock()
            .expect("Failed to acquire lock on difficulty state");
        tuning.window.push(seconds);
        if tuning.window.len() < RETARGET_WINDOW {
            return;
        }
        let average = mean(&tuning.window);
        if average >= RETARGET_SLOW_SECS && tuning.difficulty > 1 {
            tuning.difficulty -= 1;
            info!(
                "Retarget: mean block time {average:.1}s, difficulty down to {}",
                tuning.difficulty
            );
        } else if average < RETARGET_FAST_SECS {
            tuning.difficulty += 1;
            info!(
                "Retarget: mean block time {average:.1}s, difficulty up to {}",
                tuning.difficulty
            );
        }
        tuning.window.clear();
    }
}

/// Run one transaction through the settlement pipeline against the staged
/// ledger. Rule violations mark the transaction Reject and leave the stage
/// untouched; only infrastructure failures surface as errors.
pub fn settle_transaction(
    tx: &Transaction,
    stage: &mut LedgerStage,
    tx_index: &TxIndex,
    fee_rate: f64,
) -> Result<Transaction> {
    let mut settled = tx.clone();
    settled.set_status(TxStatus::Reject);

    if !tx.verify_hash() {
        return Ok(settled);
    }
    if !tx.is_coinbase() && !tx.is_command_only() && !tx.verify_signature() {
        return Ok(settled);
    }
    if tx_index.contains(tx.get_hash())? {
        return Ok(settled);
    }

    // Commands run before account resolution so CreateWallet can provision
    // the very account the rest of the pipeline looks up.
    for command in tx.get_commands() {
        match command {
            TxCommand::CreateWallet => {
                if stage.get(tx.get_from())?.is_none() {
                    stage.upsert(Account::new(tx.get_from(), tx.get_from_pub_key(), 0.0));
                }
            }
        }
    }
    if tx.is_command_only() {
        settled.set_status(TxStatus::Success);
        return Ok(settled);
    }

    let mut receiver = match stage.get(tx.get_to())? {
        Some(account) => account,
        None => return Ok(settled),
    };

    if tx.is_coinbase() {
        if receiver.nonce + 1 != tx.get_nonce() {
            return Ok(settled);
        }
        receiver.balance += tx.get_amount();
        receiver.nonce += 1;
        stage.upsert(receiver);
        settled.set_status(TxStatus::Success);
        return Ok(settled);
    }

    let mut sender = match stage.get(tx.get_from())? {
        Some(account) => account,
        None => return Ok(settled),
    };
    if sender.public_key != tx.get_from_pub_key() {
        return Ok(settled);
    }
    if sender.nonce + 1 != tx.get_nonce() {
        return Ok(settled);
    }

    let fee = floor_to_fee_precision(tx.get_amount() * fee_rate);
    if sender.balance < tx.get_amount() + fee {
        return Ok(settled);
    }

    sender.balance -= tx.get_amount() + fee;
    sender.nonce += 1;
    receiver.balance += tx.get_amount();
    receiver.nonce += 1;
    stage.upsert(sender);
    stage.upsert(receiver);
    settled.set_fee(fee);
    settled.set_status(TxStatus::Success);
    Ok(settled)
}
