// Transaction index: settled transaction hash to the block(s) that carry it.
// Settlement's replay check is a single lookup here.

use crate::error::{NodeError, Result};
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use sled::Tree;

const TX_INDEX_TREE: &str = "tx_index";

/// One settled occurrence of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxLocation {
    pub block_hash: String,
    /// Position inside the block's transaction list
    pub index: u32,
}

#[derive(Clone)]
pub struct TxIndex {
    tree: Tree,
}

impl TxIndex {
    pub fn open(db: &sled::Db) -> Result<TxIndex> {
        let tree = db
            .open_tree(TX_INDEX_TREE)
            .map_err(|e| NodeError::Store(format!("Failed to open transaction index: {e}")))?;
        Ok(TxIndex { tree })
    }

    pub fn get(&self, transaction_hash: &str) -> Result<Vec<TxLocation>> {
        let raw = self
            .tree
            .get(transaction_hash)
            .map_err(|e| NodeError::Store(format!("Failed to read transaction index: {e}")))?;
        match raw {
            Some(bytes) => deserialize::<Vec<TxLocation>>(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Has this hash already been settled into any block?
    pub fn contains(&self, transaction_hash: &str) -> Result<bool> {
        self.tree
            .contains_key(transaction_hash)
            .map_err(|e| NodeError::Store(format!("Failed to probe transaction index: {e}")))
    }

    /// Index every settled transaction of one block in a single batch. Each
    /// entry carries its position inside the block's full transaction list,
    /// so rejected neighbors and the coinbase do not shift it. Existing
    /// entries for a hash are extended, not replaced, so the same payment
    /// appearing on two forks keeps both locations.
    pub fn index_block(&self, block_hash: &str, entries: &[(u32, String)]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for (position, hash) in entries {
            let mut locations = self.get(hash)?;
            locations.push(TxLocation {
                block_hash: block_hash.to_string(),
                index: *position,
            });
            batch.insert(hash.as_bytes(), serialize(&locations)?);
        }
        self.tree
            .apply_batch(batch)
            .map_err(|e| NodeError::Store(format!("Failed to commit transaction index: {e}")))?;
        Ok(())
    }
}
