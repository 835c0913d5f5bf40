// Block index: maps block hashes to their position inside the block log,
// with a secondary height key so canonical-chain lookups stay O(log n).

use crate::error::{NodeError, Result};
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use sled::Tree;

const BLOCKS_TREE: &str = "blocks";
const HEIGHTS_TREE: &str = "block_heights";

/// Where one block record lives on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct BlockLocation {
    pub block_hash: String,
    pub height: u32,
    pub file_id: u32,
    pub offset: u32,
    pub size: u32,
    pub mainchain: bool,
}

#[derive(Clone)]
pub struct BlockIndex {
    by_hash: Tree,
    by_height: Tree,
}

impl BlockIndex {
    pub fn open(db: &sled::Db) -> Result<BlockIndex> {
        let by_hash = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| NodeError::Store(format!("Failed to open block index: {e}")))?;
        let by_height = db
            .open_tree(HEIGHTS_TREE)
            .map_err(|e| NodeError::Store(format!("Failed to open height index: {e}")))?;
        Ok(BlockIndex { by_hash, by_height })
    }

    /// Record where a block landed in the log. The height key only tracks
    /// mainchain blocks; fork blocks stay reachable by hash.
    pub fn insert(&self, location: &BlockLocation) -> Result<()> {
        let bytes = serialize(location)?;
        self.by_hash
            .insert(location.block_hash.as_bytes(), bytes)
            .map_err(|e| {
                NodeError::Store(format!("Failed to index block {}: {e}", location.block_hash))
            })?;
        if location.mainchain {
            self.by_height
                .insert(
                    location.height.to_be_bytes(),
                    location.block_hash.as_bytes(),
                )
                .map_err(|e| {
                    NodeError::Store(format!(
                        "Failed to index height {}: {e}",
                        location.height
                    ))
                })?;
        }
        Ok(())
    }

    pub fn get(&self, block_hash: &str) -> Result<Option<BlockLocation>> {
        let raw = self
            .by_hash
            .get(block_hash)
            .map_err(|e| NodeError::Store(format!("Failed to read block index: {e}")))?;
        match raw {
            Some(bytes) => Ok(Some(deserialize::<BlockLocation>(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, block_hash: &str) -> Result<bool> {
        self.by_hash
            .contains_key(block_hash)
            .map_err(|e| NodeError::Store(format!("Failed to probe block index: {e}")))
    }

    /// Mainchain block at an exact height
    pub fn get_by_height(&self, height: u32) -> Result<Option<BlockLocation>> {
        let raw = self
            .by_height
            .get(height.to_be_bytes())
            .map_err(|e| NodeError::Store(format!("Failed to read height index: {e}")))?;
        let hash = match raw {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|e| NodeError::Store(format!("Corrupt height index entry: {e}")))?,
            None => return Ok(None),
        };
        self.get(&hash)
    }

    /// The highest indexed mainchain block, None on a fresh datastore
    pub fn latest(&self) -> Result<Option<BlockLocation>> {
        let raw = self
            .by_height
            .last()
            .map_err(|e| NodeError::Store(format!("Failed to read height index: {e}")))?;
        let hash = match raw {
            Some((_, bytes)) => String::from_utf8(bytes.to_vec())
                .map_err(|e| NodeError::Store(format!("Corrupt height index entry: {e}")))?,
            None => return Ok(None),
        };
        self.get(&hash)
    }

    /// Every indexed location, fork blocks included, ordered by height.
    /// Restart recovery walks this to rebuild the forest and the log tail.
    pub fn all(&self) -> Result<Vec<BlockLocation>> {
        let mut locations = Vec::new();
        for entry in self.by_hash.iter() {
            let (_, bytes) =
                entry.map_err(|e| NodeError::Store(format!("Failed to scan block index: {e}")))?;
            locations.push(deserialize::<BlockLocation>(&bytes)?);
        }
        locations.sort_by_key(|location| location.height);
        Ok(locations)
    }

    /// Flip a block's mainchain flag, e.g. when a reorg demotes a fork.
    pub fn set_mainchain(&self, block_hash: &str, mainchain: bool) -> Result<()> {
        let mut location = self.get(block_hash)?.ok_or_else(|| {
            NodeError::Store(format!("Block {block_hash} is not in the index"))
        })?;
        location.mainchain = mainchain;
        if !mainchain {
            self.by_height
                .remove(location.height.to_be_bytes())
                .map_err(|e| NodeError::Store(format!("Failed to drop height key: {e}")))?;
        }
        self.insert(&location)
    }
}
