//! Node integration tests
//!
//! End-to-end coverage of the consensus and ledger engine: mining, transfer
//! settlement, coinbase maturity, fork handling, and chain sync over gossip.

use embercoin::core::CancelToken;
use embercoin::wallet::keystore;
use embercoin::{Account, Engine, GossipNode, PeerSet, TxStatus, UdpTransport, Wallet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const FEE_RATE: f64 = 0.001;
const TEST_DIFFICULTY: u16 = 1;
const WORKERS: usize = 2;

fn open_engine(dir: &tempfile::TempDir) -> Arc<Engine> {
    let db = sled::open(dir.path().join("db")).unwrap();
    Arc::new(Engine::open(&db, &dir.path().join("blocks"), FEE_RATE, TEST_DIFFICULTY).unwrap())
}

fn mine(engine: &Engine, miner: &str, count: u32) {
    let cancel = CancelToken::new();
    for _ in 0..count {
        engine
            .produce_block(miner, WORKERS, &cancel)
            .unwrap()
            .expect("test difficulty must mine");
    }
}

#[test]
fn test_transfer_settles_and_fee_matures_with_the_block_reward() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);

    let alice = Wallet::new().unwrap();
    engine
        .accounts()
        .put(&Account::new(&alice.get_address(), &alice.get_public_key_hex(), 1000.0))
        .unwrap();
    engine
        .accounts()
        .put(&Account::new("0xbob", "bobkey", 0.0))
        .unwrap();
    engine
        .accounts()
        .put(&Account::new("0xminer", "minerkey", 0.0))
        .unwrap();

    // Block 1 carries the 100-coin transfer at a 0.1% fee
    engine
        .submit_transaction(alice.sign_transfer("0xbob", 100.0, 1).unwrap())
        .unwrap();
    mine(&engine, "0xminer", 1);

    let sender = engine.accounts().get(&alice.get_address()).unwrap().unwrap();
    let receiver = engine.accounts().get("0xbob").unwrap().unwrap();
    assert_eq!(sender.balance, 899.9);
    assert_eq!(sender.nonce, 1);
    assert_eq!(receiver.balance, 100.0);
    assert_eq!(receiver.nonce, 1);

    // The fee is queued, not paid: the miner has nothing yet
    assert_eq!(engine.accounts().get("0xminer").unwrap().unwrap().balance, 0.0);

    // Ten blocks later the reward plus the collected fee pays out
    mine(&engine, "0xminer", 10);
    let miner = engine.accounts().get("0xminer").unwrap().unwrap();
    assert_eq!(miner.balance, 1001.0 + 0.1);
    assert_eq!(miner.nonce, 1);
}

#[test]
fn test_settled_transaction_cannot_settle_twice() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);

    let alice = Wallet::new().unwrap();
    engine
        .accounts()
        .put(&Account::new(&alice.get_address(), &alice.get_public_key_hex(), 1000.0))
        .unwrap();
    engine
        .accounts()
        .put(&Account::new("0xbob", "bobkey", 0.0))
        .unwrap();

    let tx = alice.sign_transfer("0xbob", 100.0, 1).unwrap();
    engine.submit_transaction(tx.clone()).unwrap();
    mine(&engine, "0xminer-a", 1);

    // The identical bytes arrive again, e.g. relayed by a slow peer
    engine.submit_transaction(tx.clone()).unwrap();
    mine(&engine, "0xminer-a", 1);

    let sender = engine.accounts().get(&alice.get_address()).unwrap().unwrap();
    assert_eq!(sender.balance, 899.9);
    assert_eq!(sender.nonce, 1);

    // The second block recorded the attempt as rejected
    let record = {
        let records = engine.mainchain_blocks_above(1).unwrap();
        records.into_iter().next().unwrap()
    };
    let replayed = record
        .block
        .get_transactions()
        .iter()
        .find(|settled| settled.get_hash() == tx.get_hash())
        .unwrap();
    assert_eq!(replayed.get_status(), TxStatus::Reject);
}

#[test]
fn test_nonce_gap_waits_until_the_predecessor_lands() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);

    let alice = Wallet::new().unwrap();
    engine
        .accounts()
        .put(&Account::new(&alice.get_address(), &alice.get_public_key_hex(), 1000.0))
        .unwrap();
    engine
        .accounts()
        .put(&Account::new("0xbob", "bobkey", 0.0))
        .unwrap();

    // Nonce 2 submitted while the account still sits at 0
    engine
        .submit_transaction(alice.sign_transfer("0xbob", 10.0, 2).unwrap())
        .unwrap();
    mine(&engine, "0xminer", 1);
    assert_eq!(engine.accounts().get("0xbob").unwrap().unwrap().balance, 0.0);

    // Once nonce 1 settles, a resubmitted nonce 2 goes through
    engine
        .submit_transaction(alice.sign_transfer("0xbob", 10.0, 1).unwrap())
        .unwrap();
    mine(&engine, "0xminer", 1);
    engine
        .submit_transaction(alice.sign_transfer("0xbob", 10.0, 2).unwrap())
        .unwrap();
    mine(&engine, "0xminer", 1);

    assert_eq!(engine.accounts().get("0xbob").unwrap().unwrap().balance, 20.0);
}

#[test]
fn test_block_record_survives_the_log_round_trip() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir);

    let alice = Wallet::new().unwrap();
    engine
        .accounts()
        .put(&Account::new(&alice.get_address(), &alice.get_public_key_hex(), 1000.0))
        .unwrap();
    engine
        .accounts()
        .put(&Account::new("0xbob", "bobkey", 0.0))
        .unwrap();
    engine
        .submit_transaction(alice.sign_transfer("0xbob", 42.5, 1).unwrap())
        .unwrap();

    let cancel = CancelToken::new();
    let block = engine
        .produce_block("0xminer", WORKERS, &cancel)
        .unwrap()
        .unwrap();

    let record = engine
        .read_block(block.get_hash().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(record.block.get_hash(), block.get_hash());
    assert_eq!(record.block.get_merkle_root(), block.get_merkle_root());
    assert_eq!(record.miner, "0xminer");
    assert!(record.block.verify_self_hash());

    let stored = &record.block.get_transactions()[0];
    assert_eq!(stored.get_amount(), 42.5);
    assert_eq!(stored.get_status(), TxStatus::Success);
}

#[test]
fn test_wallet_keystore_holds_the_mining_identity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wallet.dat");

    let (wallet, created) = keystore::load_or_create(&path, "integration!").unwrap();
    assert!(created);
    let (reloaded, created) = keystore::load_or_create(&path, "integration!").unwrap();
    assert!(!created);
    assert_eq!(wallet.get_address(), reloaded.get_address());

    // The reloaded key still signs valid transfers
    let tx = reloaded.sign_transfer("0xbob", 1.0, 1).unwrap();
    assert!(tx.verify_signature());
}

fn gossip_fixture(engine: Arc<Engine>) -> (GossipNode, SocketAddr) {
    let transport = Arc::new(UdpTransport::bind(0).unwrap());
    let peers = Arc::new(PeerSet::new(&[], 8));
    let port = transport.local_addr().unwrap().port();
    let address = format!("127.0.0.1:{port}").parse().unwrap();

    let inbox = transport.start_receiver().unwrap();
    let node = GossipNode::new(engine, transport, peers);
    let runner = node.clone();
    thread::spawn(move || runner.run(inbox));
    (node, address)
}

#[test]
fn test_fresh_node_syncs_the_chain_from_a_peer() {
    let seed_dir = tempdir().unwrap();
    let seed_engine = open_engine(&seed_dir);
    mine(&seed_engine, "0xminer", 3);

    let (_seed_node, seed_addr) = gossip_fixture(Arc::clone(&seed_engine));

    let fresh_dir = tempdir().unwrap();
    let fresh_engine = open_engine(&fresh_dir);
    let (fresh_node, _fresh_addr) = gossip_fixture(Arc::clone(&fresh_engine));

    fresh_node.request_blocks(seed_addr).unwrap();

    // Replay is paced at 200ms per block; allow generous headroom
    let deadline = Instant::now() + Duration::from_secs(10);
    while fresh_engine.chain_height() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(fresh_engine.chain_height(), 3);

    // Both nodes agree on the tip
    let seed_tip = seed_engine.mainchain_blocks_above(2).unwrap();
    let fresh_tip = fresh_engine.mainchain_blocks_above(2).unwrap();
    assert_eq!(
        seed_tip[0].block.get_hash().unwrap(),
        fresh_tip[0].block.get_hash().unwrap()
    );
}
