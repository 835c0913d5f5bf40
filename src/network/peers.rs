// Known-peer bookkeeping. Seeded from the configured bootstrap list; every
// inbound datagram and every AnswerNodesList merge adds to it.

use crate::error::{NodeError, Result};
use log::info;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::RwLock;

pub struct PeerSet {
    known: RwLock<HashSet<SocketAddr>>,
    max_gossip_fanout: usize,
}

impl PeerSet {
    pub fn new(bootstrap: &[SocketAddr], max_gossip_fanout: usize) -> PeerSet {
        PeerSet {
            known: RwLock::new(bootstrap.iter().copied().collect()),
            max_gossip_fanout,
        }
    }

    pub fn add(&self, address: SocketAddr) -> Result<bool> {
        let mut known = self
            .known
            .write()
            .map_err(|e| NodeError::Network(format!("Failed to acquire peer lock: {e}")))?;
        let added = known.insert(address);
        if added {
            info!("Learned peer: {address}");
        }
        Ok(added)
    }

    pub fn merge(&self, addresses: &[SocketAddr]) -> Result<usize> {
        let mut known = self
            .known
            .write()
            .map_err(|e| NodeError::Network(format!("Failed to acquire peer lock: {e}")))?;
        let before = known.len();
        known.extend(addresses.iter().copied());
        Ok(known.len() - before)
    }

    pub fn all(&self) -> Result<Vec<SocketAddr>> {
        let known = self
            .known
            .read()
            .map_err(|e| NodeError::Network(format!("Failed to acquire peer lock: {e}")))?;
        Ok(known.iter().copied().collect())
    }

    /// Up to `max_gossip_fanout` peers excluding `sender`, in random order.
    /// Forwarding a relayed message back to its source would loop forever.
    pub fn gossip_targets(&self, sender: Option<SocketAddr>) -> Result<Vec<SocketAddr>> {
        let known = self
            .known
            .read()
            .map_err(|e| NodeError::Network(format!("Failed to acquire peer lock: {e}")))?;
        let mut targets: Vec<SocketAddr> = known
            .iter()
            .copied()
            .filter(|address| Some(*address) != sender)
            .collect();
        targets.shuffle(&mut rand::thread_rng());
        targets.truncate(self.max_gossip_fanout);
        Ok(targets)
    }

    pub fn count(&self) -> Result<usize> {
        let known = self
            .known
            .read()
            .map_err(|e| NodeError::Network(format!("Failed to acquire peer lock: {e}")))?;
        Ok(known.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn test_bootstrap_peers_are_known() {
        let peers = PeerSet::new(&[addr(2001), addr(2002)], 8);
        assert_eq!(peers.count().unwrap(), 2);
    }

    #[test]
    fn test_gossip_targets_exclude_the_sender() {
        let peers = PeerSet::new(&[addr(2001), addr(2002)], 8);
        let targets = peers.gossip_targets(Some(addr(2001))).unwrap();
        assert_eq!(targets, vec![addr(2002)]);
    }

    #[test]
    fn test_gossip_fanout_is_bounded() {
        let many: Vec<SocketAddr> = (3000..3020).map(addr).collect();
        let peers = PeerSet::new(&many, 5);
        assert_eq!(peers.gossip_targets(None).unwrap().len(), 5);
    }

    #[test]
    fn test_merge_reports_new_entries_only() {
        let peers = PeerSet::new(&[addr(2001)], 8);
        let added = peers.merge(&[addr(2001), addr(2002)]).unwrap();
        assert_eq!(added, 1);
        assert_eq!(peers.count().unwrap(), 2);
    }
}
