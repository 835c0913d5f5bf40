// Account ledger: one record per address, held in a sled tree and mutated
// only through the settlement pipeline via a staged, all-or-nothing commit.

use crate::core::transaction::format_amount;
use crate::error::{NodeError, Result};
use crate::utils::{deserialize, serialize, sha256_hex};
use serde::{Deserialize, Serialize};
use sled::Tree;
use std::collections::HashMap;

const ACCOUNTS_TREE: &str = "accounts";

pub const ACCOUNT_STATUS_ACTIVE: &str = "active";

/// One ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Account {
    pub address: String,
    pub public_key: String,
    pub balance: f64,
    pub nonce: u32,
    pub status: String,
}

impl Account {
    pub fn new(address: &str, public_key: &str, balance: f64) -> Account {
        Account {
            address: address.to_string(),
            public_key: public_key.to_string(),
            balance,
            nonce: 0,
            status: ACCOUNT_STATUS_ACTIVE.to_string(),
        }
    }

    /// Leaf digest of this account inside the per-block state root.
    pub fn state_digest(&self) -> String {
        let preimage = format!(
            "{}{}{}{}{}",
            self.address,
            format_amount(self.balance),
            self.nonce,
            self.public_key,
            self.status
        );
        sha256_hex(&preimage)
    }
}

/// Sled-backed account table
#[derive(Clone)]
pub struct AccountStore {
    tree: Tree,
}

impl AccountStore {
    pub fn open(db: &sled::Db) -> Result<AccountStore> {
        let tree = db
            .open_tree(ACCOUNTS_TREE)
            .map_err(|e| NodeError::Store(format!("Failed to open accounts tree: {e}")))?;
        Ok(AccountStore { tree })
    }

    pub fn get(&self, address: &str) -> Result<Option<Account>> {
        let raw = self
            .tree
            .get(address)
            .map_err(|e| NodeError::Store(format!("Failed to read account {address}: {e}")))?;
        match raw {
            Some(bytes) => Ok(Some(deserialize::<Account>(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put(&self, account: &Account) -> Result<()> {
        let bytes = serialize(account)?;
        self.tree
            .insert(account.address.as_bytes(), bytes)
            .map_err(|e| {
                NodeError::Store(format!("Failed to write account {}: {e}", account.address))
            })?;
        Ok(())
    }

    /// Every account, ordered by address. Sled iterates in key order, which
    /// is what makes the state root deterministic across nodes.
    pub fn all(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) =
                item.map_err(|e| NodeError::Store(format!("Account iteration failed: {e}")))?;
            accounts.push(deserialize::<Account>(&bytes)?);
        }
        Ok(accounts)
    }

    /// Apply a set of mutated accounts in one atomic batch.
    fn apply(&self, accounts: &[Account]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for account in accounts {
            batch.insert(account.address.as_bytes(), serialize(account)?);
        }
        self.tree
            .apply_batch(batch)
            .map_err(|e| NodeError::Store(format!("Failed to commit ledger batch: {e}")))?;
        Ok(())
    }
}

/// Staged view of the ledger used while settling one block.
///
/// Reads fall through to the store; writes stay in the overlay until
/// `commit`. Dropping the stage is the rollback.
pub struct LedgerStage<'a> {
    store: &'a AccountStore,
    staged: HashMap<String, Account>,
}

impl<'a> LedgerStage<'a> {
    pub fn new(store: &'a AccountStore) -> LedgerStage<'a> {
        LedgerStage {
            store,
            staged: HashMap::new(),
        }
    }

    pub fn get(&self, address: &str) -> Result<Option<Account>> {
        if let Some(account) = self.staged.get(address) {
            return Ok(Some(account.clone()));
        }
        self.store.get(address)
    }

    pub fn upsert(&mut self, account: Account) {
        self.staged.insert(account.address.clone(), account);
    }

    /// Full ledger as it would look after this block, ordered by address.
    pub fn snapshot(&self) -> Result<Vec<Account>> {
        let mut merged: Vec<Account> = self
            .store
            .all()?
            .into_iter()
            .filter(|account| !self.staged.contains_key(&account.address))
            .collect();
        merged.extend(self.staged.values().cloned());
        merged.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(merged)
    }

    /// Commit every staged mutation atomically. No partial balance update is
    /// ever visible to a reader.
    pub fn commit(self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let accounts: Vec<Account> = self.staged.into_values().collect();
        self.store.apply(&accounts)
    }
}
