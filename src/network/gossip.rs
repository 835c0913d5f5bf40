// Gossip protocol handler. Consumes raw datagrams from the transport channel
// and drives the engine: block announcements settle and forward, transactions
// queue and forward, and a syncing peer gets a paced replay of the chain.

use crate::core::engine::{BlockAcceptance, Engine};
use crate::core::transaction::Transaction;
use crate::core::Block;
use crate::error::Result;
use crate::network::peers::PeerSet;
use crate::network::protocol::{
    decode_header, decode_payload, encode_message, EmptyPayload, FoundBlockPayload,
    NewTransactionPayload, NodesListPayload, OpCode, RequestBlocksPayload,
};
use crate::network::transport::{Datagram, UdpTransport};
use crate::storage::BlockRecord;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cadence of the block replay a syncing peer receives
const REPLAY_PACE: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct GossipNode {
    engine: Arc<Engine>,
    transport: Arc<UdpTransport>,
    peers: Arc<PeerSet>,
}

impl GossipNode {
    pub fn new(engine: Arc<Engine>, transport: Arc<UdpTransport>, peers: Arc<PeerSet>) -> GossipNode {
        GossipNode {
            engine,
            transport,
            peers,
        }
    }

    /// Drain the transport channel until it closes. A malformed datagram is
    /// logged and dropped; it never takes the handler down.
    pub fn run(&self, inbox: Receiver<Datagram>) {
        for datagram in inbox {
            if let Err(e) = self.handle(&datagram) {
                warn!("Dropped datagram from {}: {e}", datagram.from);
            }
        }
        info!("Transport channel closed; gossip handler stopping");
    }

    fn handle(&self, datagram: &Datagram) -> Result<()> {
        let (opcode, body) = decode_header(&datagram.bytes)?;
        match opcode {
            OpCode::FoundBlockHash => self.on_found_block(datagram.from, body),
            OpCode::NewTransaction => self.on_new_transaction(datagram.from, body),
            OpCode::RequestNodesList => self.on_request_nodes(datagram.from),
            OpCode::AnswerNodesList => self.on_answer_nodes(body),
            OpCode::RequestBlocks => self.on_request_blocks(datagram.from, body),
            OpCode::EndBlocks => {
                info!("Block replay from {} complete", datagram.from);
                Ok(())
            }
        }
    }

    fn on_found_block(&self, sender: SocketAddr, body: &[u8]) -> Result<()> {
        let payload: FoundBlockPayload = decode_payload(body)?;
        self.peers.add(sender)?;

        // Recompute before trusting anything else in the payload
        if !payload.block.verify_self_hash() {
            warn!(
                "Announced block at height {} fails hash verification; dropping",
                payload.block.get_height()
            );
            return Ok(());
        }

        let outcome = self.engine.accept_external_block(BlockRecord {
            block: payload.block.clone(),
            miner: payload.miner.clone(),
            mainchain: true,
        })?;

        if outcome == BlockAcceptance::AlreadyKnown || payload.private {
            return Ok(());
        }
        self.forward(OpCode::FoundBlockHash, &payload, Some(sender))
    }

    fn on_new_transaction(&self, sender: SocketAddr, body: &[u8]) -> Result<()> {
        let payload: NewTransactionPayload = decode_payload(body)?;
        self.peers.add(sender)?;

        if !payload.transaction.verify_hash() {
            warn!("Relayed transaction fails hash verification; dropping");
            return Ok(());
        }
        if self.engine.submit_transaction(payload.transaction.clone())? {
            self.forward(OpCode::NewTransaction, &payload, Some(sender))?;
        }
        Ok(())
    }

    fn on_request_nodes(&self, sender: SocketAddr) -> Result<()> {
        self.peers.add(sender)?;
        let nodes: Vec<String> = self
            .peers
            .all()?
            .into_iter()
            .map(|address| address.to_string())
            .collect();
        let message = encode_message(OpCode::AnswerNodesList, &NodesListPayload { nodes })?;
        self.transport.send(sender, &message)
    }

    fn on_answer_nodes(&self, body: &[u8]) -> Result<()> {
        let payload: NodesListPayload = decode_payload(body)?;
        let mut addresses = Vec::with_capacity(payload.nodes.len());
        for node in &payload.nodes {
            match node.parse::<SocketAddr>() {
                Ok(address) => addresses.push(address),
                Err(e) => warn!("Ignoring malformed peer address {node}: {e}"),
            }
        }
        let added = self.peers.merge(&addresses)?;
        if added > 0 {
            info!("Learned {added} peers from a nodes-list answer");
        }
        Ok(())
    }

    /// Stream every block above the requester's height at a fixed cadence,
    /// flagged private so the requester does not re-forward them, then close
    /// with EndBlocks.
    fn on_request_blocks(&self, sender: SocketAddr, body: &[u8]) -> Result<()> {
        let payload: RequestBlocksPayload = decode_payload(body)?;
        self.peers.add(sender)?;

        let engine = Arc::clone(&self.engine);
        let transport = Arc::clone(&self.transport);
        thread::spawn(move || {
            if let Err(e) = replay_blocks(&engine, &transport, sender, payload.height) {
                warn!("Block replay to {sender} failed: {e}");
            }
        });
        Ok(())
    }

    /// Announce a block this node mined to every known peer.
    pub fn announce_block(&self, block: &Block, miner: &str) -> Result<()> {
        let payload = FoundBlockPayload {
            block: block.clone(),
            miner: miner.to_string(),
            private: false,
        };
        self.forward(OpCode::FoundBlockHash, &payload, None)
    }

    /// Relay a locally submitted transaction.
    pub fn announce_transaction(&self, transaction: &Transaction) -> Result<()> {
        let payload = NewTransactionPayload {
            transaction: transaction.clone(),
        };
        self.forward(OpCode::NewTransaction, &payload, None)
    }

    /// Ask a peer for everything above our current height.
    pub fn request_blocks(&self, from: SocketAddr) -> Result<()> {
        let payload = RequestBlocksPayload {
            height: self.engine.chain_height(),
        };
        let message = encode_message(OpCode::RequestBlocks, &payload)?;
        self.transport.send(from, &message)
    }

    pub fn request_nodes(&self, from: SocketAddr) -> Result<()> {
        let message = encode_message(OpCode::RequestNodesList, &EmptyPayload {})?;
        self.transport.send(from, &message)
    }

    fn forward<T: serde::Serialize>(
        &self,
        opcode: OpCode,
        payload: &T,
        exclude: Option<SocketAddr>,
    ) -> Result<()> {
        let message = encode_message(opcode, payload)?;
        for target in self.peers.gossip_targets(exclude)? {
            if let Err(e) = self.transport.send(target, &message) {
                warn!("Forward to {target} failed: {e}");
            }
        }
        Ok(())
    }
}

fn replay_blocks(
    engine: &Engine,
    transport: &UdpTransport,
    to: SocketAddr,
    above_height: u32,
) -> Result<()> {
    let records = engine.mainchain_blocks_above(above_height)?;
    info!("Replaying {} blocks to {to}", records.len());
    for record in records {
        let payload = FoundBlockPayload {
            block: record.block,
            miner: record.miner,
            private: true,
        };
        let message = encode_message(OpCode::FoundBlockHash, &payload)?;
        transport.send(to, &message)?;
        thread::sleep(REPLAY_PACE);
    }
    let end = encode_message(OpCode::EndBlocks, &EmptyPayload {})?;
    transport.send(to, &end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_node() -> (tempfile::TempDir, GossipNode, SocketAddr) {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path().join("db")).unwrap();
        let engine = Arc::new(Engine::open(&db, &dir.path().join("blocks"), 0.001, 1).unwrap());
        let transport = Arc::new(UdpTransport::bind(0).unwrap());
        let peers = Arc::new(PeerSet::new(&[], 8));

        let port = transport.local_addr().unwrap().port();
        let address = format!("127.0.0.1:{port}").parse().unwrap();
        let inbox = transport.start_receiver().unwrap();
        let node = GossipNode::new(engine, Arc::clone(&transport), peers);
        let runner = node.clone();
        thread::spawn(move || runner.run(inbox));
        (dir, node, address)
    }

    #[test]
    fn test_nodes_list_request_gets_an_answer() {
        let (_dir, _node, server) = test_node();
        let client = UdpTransport::bind(0).unwrap();
        let client_inbox = client.start_receiver().unwrap();

        let request = encode_message(OpCode::RequestNodesList, &EmptyPayload {}).unwrap();
        client.send(server, &request).unwrap();

        let answer = client_inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        let (opcode, body) = decode_header(&answer.bytes).unwrap();
        assert_eq!(opcode, OpCode::AnswerNodesList);
        let payload: NodesListPayload = decode_payload(body).unwrap();
        // The requester itself is the one known peer
        assert_eq!(payload.nodes.len(), 1);
    }

    #[test]
    fn test_hostile_difficulty_announcement_does_not_kill_the_handler() {
        use crate::core::pow::{block_hash, block_hash_preimage};

        let (_dir, _node, server) = test_node();
        let client = UdpTransport::bind(0).unwrap();
        let client_inbox = client.start_receiver().unwrap();

        // Internally consistent header whose difficulty exceeds the hash
        // length entirely; verification must drop it, not panic
        let preimage = block_hash_preimage(1, 1, "prev", "root", 1_700_000_000, 65);
        let self_hash = block_hash(&preimage, 7);
        let block = Block::from_parts(
            1,
            1,
            "prev".to_string(),
            1_700_000_000,
            65,
            7,
            "root".to_string(),
            "state".to_string(),
            self_hash,
            vec![],
        );
        let payload = FoundBlockPayload {
            block,
            miner: "0xrogue".to_string(),
            private: false,
        };
        let message = encode_message(OpCode::FoundBlockHash, &payload).unwrap();
        client.send(server, &message).unwrap();

        let request = encode_message(OpCode::RequestNodesList, &EmptyPayload {}).unwrap();
        client.send(server, &request).unwrap();

        // The handler survived and still answers
        let answer = client_inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        let (opcode, _) = decode_header(&answer.bytes).unwrap();
        assert_eq!(opcode, OpCode::AnswerNodesList);
    }

    #[test]
    fn test_malformed_datagram_does_not_kill_the_handler() {
        let (_dir, _node, server) = test_node();
        let client = UdpTransport::bind(0).unwrap();
        let client_inbox = client.start_receiver().unwrap();

        client.send(server, b"garbage").unwrap();
        let request = encode_message(OpCode::RequestNodesList, &EmptyPayload {}).unwrap();
        client.send(server, &request).unwrap();

        // The handler survived the garbage and still answers
        let answer = client_inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        let (opcode, _) = decode_header(&answer.bytes).unwrap();
        assert_eq!(opcode, OpCode::AnswerNodesList);
    }
}
