// Fork tracking. The forest holds one compact record per observed block,
// indexed by hash with a back-pointer to its predecessor, so tip lookup and
// stale-fork pruning stay cheap as the chain grows.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The minimal per-block record the fork tracker needs. Full blocks live
/// only in the block log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactBlock {
    pub block_hash: String,
    pub height: u32,
    pub previous_hash: String,
}

impl CompactBlock {
    pub fn new(block_hash: &str, height: u32, previous_hash: &str) -> CompactBlock {
        CompactBlock {
            block_hash: block_hash.to_string(),
            height,
            previous_hash: previous_hash.to_string(),
        }
    }
}

/// Lifecycle of a record inside the forest: every record enters Unlinked and
/// becomes Extended once a successor is appended to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unlinked,
    Extended,
}

#[derive(Debug, Clone)]
struct ForestNode {
    compact: CompactBlock,
    state: LinkState,
}

/// What happened when a compact block was offered to the forest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Appended to an existing fork's tip
    ExtendedFork,
    /// Started a brand-new fork (also covers genesis)
    NewFork,
    /// Hash was already recorded; nothing changed
    AlreadyKnown,
}

#[derive(Debug, Default)]
pub struct ChainForest {
    nodes: HashMap<String, ForestNode>,
    tips: HashSet<String>,
}

impl ChainForest {
    pub fn new() -> ChainForest {
        ChainForest::default()
    }

    /// Offer a compact block. If its previous hash matches an existing tip
    /// the fork is extended; otherwise a new single-element fork starts.
    pub fn insert(&mut self, compact: CompactBlock) -> InsertOutcome {
        if self.nodes.contains_key(&compact.block_hash) {
            return InsertOutcome::AlreadyKnown;
        }

        let extends_tip = self.tips.contains(&compact.previous_hash);
        if extends_tip {
            self.tips.remove(&compact.previous_hash);
            if let Some(parent) = self.nodes.get_mut(&compact.previous_hash) {
                parent.state = LinkState::Extended;
            }
        } else {
            debug!(
                "New fork at height {} ({})",
                compact.height, compact.block_hash
            );
        }

        self.tips.insert(compact.block_hash.clone());
        self.nodes.insert(
            compact.block_hash.clone(),
            ForestNode {
                compact,
                state: LinkState::Unlinked,
            },
        );

        if extends_tip {
            InsertOutcome::ExtendedFork
        } else {
            InsertOutcome::NewFork
        }
    }

    /// The canonical tip: greatest height wins; equal heights break the tie
    /// deterministically toward the lexicographically smallest hash.
    pub fn main_tip(&self) -> Option<&CompactBlock> {
        self.tips
            .iter()
            .filter_map(|hash| self.nodes.get(hash))
            .map(|node| &node.compact)
            .max_by(|a, b| {
                a.height
                    .cmp(&b.height)
                    .then_with(|| b.block_hash.cmp(&a.block_hash))
            })
    }

    /// Height of the canonical tip, 0 when the forest is empty
    pub fn main_height(&self) -> u32 {
        self.main_tip().map(|tip| tip.height).unwrap_or(0)
    }

    pub fn contains(&self, block_hash: &str) -> bool {
        self.nodes.contains_key(block_hash)
    }

    pub fn get(&self, block_hash: &str) -> Option<&CompactBlock> {
        self.nodes.get(block_hash).map(|node| &node.compact)
    }

    pub fn link_state(&self, block_hash: &str) -> Option<LinkState> {
        self.nodes.get(block_hash).map(|node| node.state)
    }

    pub fn tip_count(&self) -> usize {
        self.tips.len()
    }

    /// Is some fork's tip already sitting at this height under a different
    /// hash? Losing a mining race looks exactly like this.
    pub fn has_competing_tip_at(&self, height: u32, block_hash: &str) -> bool {
        self.tips
            .iter()
            .filter_map(|hash| self.nodes.get(hash))
            .any(|node| node.compact.height == height && node.compact.block_hash != block_hash)
    }

    /// Walk a fork tip-to-root following previous-hash back-pointers.
    pub fn fork_of(&self, tip_hash: &str) -> Vec<&CompactBlock> {
        let mut sequence = Vec::new();
        let mut cursor = tip_hash.to_string();
        while let Some(node) = self.nodes.get(&cursor) {
            sequence.push(&node.compact);
            cursor = node.compact.previous_hash.clone();
        }
        sequence
    }

    /// The canonical fork, tip first.
    pub fn main_chain(&self) -> Vec<&CompactBlock> {
        match self.main_tip() {
            Some(tip) => self.fork_of(&tip.block_hash.clone()),
            None => Vec::new(),
        }
    }

    /// Drop every fork whose tip has fallen `depth` or more blocks behind the
    /// canonical tip. Nodes shared with the main chain are kept.
    pub fn prune_stale_forks(&mut self, depth: u32) -> usize {
        let main_tip_hash = match self.main_tip() {
            Some(tip) => tip.block_hash.clone(),
            None => return 0,
        };
        let main_height = self.main_height();
        let keep: HashSet<String> = self
            .fork_of(&main_tip_hash)
            .iter()
            .map(|compact| compact.block_hash.clone())
            .collect();

        let stale_tips: Vec<String> = self
            .tips
            .iter()
            .filter_map(|hash| self.nodes.get(hash))
            .filter(|node| {
                node.compact.block_hash != main_tip_hash
                    && node.compact.height + depth <= main_height
            })
            .map(|node| node.compact.block_hash.clone())
            .collect();

        let mut removed = 0;
        for tip in stale_tips {
            let mut cursor = tip.clone();
            while let Some(node) = self.nodes.get(&cursor) {
                if keep.contains(&cursor) {
                    break;
                }
                let parent = node.compact.previous_hash.clone();
                self.nodes.remove(&cursor);
                removed += 1;
                cursor = parent;
            }
            self.tips.remove(&tip);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact(hash: &str, height: u32, prev: &str) -> CompactBlock {
        CompactBlock::new(hash, height, prev)
    }

    #[test]
    fn test_genesis_starts_a_fork() {
        let mut forest = ChainForest::new();
        let outcome = forest.insert(compact("aa", 1, "00"));
        assert_eq!(outcome, InsertOutcome::NewFork);
        assert_eq!(forest.main_height(), 1);
        assert_eq!(forest.link_state("aa"), Some(LinkState::Unlinked));
    }

    #[test]
    fn test_extension_links_predecessor() {
        let mut forest = ChainForest::new();
        forest.insert(compact("aa", 1, "00"));
        let outcome = forest.insert(compact("bb", 2, "aa"));

        assert_eq!(outcome, InsertOutcome::ExtendedFork);
        assert_eq!(forest.link_state("aa"), Some(LinkState::Extended));
        assert_eq!(forest.link_state("bb"), Some(LinkState::Unlinked));
        assert_eq!(forest.tip_count(), 1);
    }

    #[test]
    fn test_every_record_points_at_its_predecessor() {
        let mut forest = ChainForest::new();
        forest.insert(compact("aa", 1, "00"));
        forest.insert(compact("bb", 2, "aa"));
        forest.insert(compact("cc", 3, "bb"));

        let chain = forest.main_chain();
        for pair in chain.windows(2) {
            assert_eq!(pair[0].previous_hash, pair[1].block_hash);
        }
    }

    #[test]
    fn test_competing_block_creates_second_fork() {
        let mut forest = ChainForest::new();
        forest.insert(compact("aa", 1, "00"));
        forest.insert(compact("bb", 2, "aa"));

        // A rival block at height 2 arrives after "bb" took the tip
        let outcome = forest.insert(compact("b2", 2, "aa"));
        assert_eq!(outcome, InsertOutcome::NewFork);
        assert_eq!(forest.tip_count(), 2);
        assert!(forest.has_competing_tip_at(2, "b2"));
    }

    #[test]
    fn test_main_chain_follows_greatest_height() {
        let mut forest = ChainForest::new();
        forest.insert(compact("aa", 1, "00"));
        forest.insert(compact("bb", 2, "aa"));
        forest.insert(compact("b2", 2, "aa"));
        forest.insert(compact("cc", 3, "b2"));

        assert_eq!(forest.main_tip().unwrap().block_hash, "cc");
        assert_eq!(forest.main_height(), 3);
    }

    #[test]
    fn test_equal_height_tie_breaks_to_smallest_hash() {
        let mut forest = ChainForest::new();
        forest.insert(compact("zz", 1, "00"));
        forest.insert(compact("aa", 1, "00"));

        assert_eq!(forest.main_tip().unwrap().block_hash, "aa");
    }

    #[test]
    fn test_duplicate_insert_is_ignored() {
        let mut forest = ChainForest::new();
        forest.insert(compact("aa", 1, "00"));
        assert_eq!(
            forest.insert(compact("aa", 1, "00")),
            InsertOutcome::AlreadyKnown
        );
        assert_eq!(forest.tip_count(), 1);
    }

    #[test]
    fn test_prune_removes_deep_stale_fork() {
        let mut forest = ChainForest::new();
        forest.insert(compact("aa", 1, "00"));
        forest.insert(compact("b2", 2, "aa")); // loses the race
        forest.insert(compact("bb", 2, "aa"));
        forest.insert(compact("cc", 3, "bb"));
        forest.insert(compact("dd", 4, "cc"));

        let removed = forest.prune_stale_forks(2);
        assert_eq!(removed, 1);
        assert!(!forest.contains("b2"));
        // Shared ancestor survives
        assert!(forest.contains("aa"));
        assert_eq!(forest.tip_count(), 1);
    }
}
