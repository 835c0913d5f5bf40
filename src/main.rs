use clap::Parser;
use embercoin::core::CancelToken;
use embercoin::network::protocol::{encode_message, NewTransactionPayload, OpCode};
use embercoin::wallet::{keystore, Wallet};
use embercoin::{
    Command, Engine, GossipNode, Opt, PeerSet, Settings, Transaction, UdpTransport,
};
use log::{error, info, warn, LevelFilter};
use std::net::SocketAddr;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause between production attempts when a block was abandoned
const MINE_RETRY_PAUSE: Duration = Duration::from_secs(1);

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();
    let data_dir = opt
        .data_dir
        .unwrap_or_else(Settings::default_data_dir);

    if let Err(e) = run_command(opt.command, &data_dir) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load_or_create(data_dir)?;

    match command {
        Command::CreateWallet { passphrase } => {
            let (wallet, created) =
                keystore::load_or_create(&settings.wallet_path(data_dir), &passphrase)?;
            if !created {
                return Err("A wallet already exists in this data directory".into());
            }
            println!("Your new address: {}", wallet.get_address());
        }

        Command::GetBalance { address } => {
            let db = sled::open(settings.db_path(data_dir))?;
            let engine = open_engine(&db, &settings, data_dir)?;
            match engine.accounts().get(&address)? {
                Some(account) => println!("Balance of {address}: {}", account.balance),
                None => return Err(format!("Unknown address: {address}").into()),
            }
        }

        Command::Send {
            to,
            amount,
            passphrase,
            nonce,
        } => {
            if amount <= 0.0 {
                return Err("Amount must be positive".into());
            }
            let wallet = keystore::load_wallet(&settings.wallet_path(data_dir), &passphrase)?;
            let nonce = match nonce {
                Some(nonce) => nonce,
                None => {
                    let db = sled::open(settings.db_path(data_dir))?;
                    let engine = open_engine(&db, &settings, data_dir)?;
                    match engine.accounts().get(&wallet.get_address())? {
                        Some(account) => account.nonce + 1,
                        None => return Err("Sender account is not on the ledger yet".into()),
                    }
                }
            };
            let transaction = wallet.sign_transfer(&to, amount, nonce)?;
            gossip_transaction(&settings, &transaction)?;
            println!("Sent {amount} to {to} (nonce {nonce})");
        }

        Command::PrintChain => {
            let db = sled::open(settings.db_path(data_dir))?;
            let engine = open_engine(&db, &settings, data_dir)?;
            for record in engine.mainchain_blocks_above(0)? {
                let block = &record.block;
                println!(
                    "height {} hash {} prev {} txs {} miner {}",
                    block.get_height(),
                    block.get_hash().unwrap_or("?"),
                    block.get_previous_hash(),
                    block.get_transactions().len(),
                    record.miner,
                );
            }
        }

        Command::Start { passphrase, no_mine } => {
            start_node(&settings, data_dir, &passphrase, no_mine)?;
        }
    }
    Ok(())
}

fn open_engine(db: &sled::Db, settings: &Settings, data_dir: &Path) -> embercoin::Result<Engine> {
    Engine::open(
        db,
        &settings.blocks_dir(data_dir),
        settings.fee_rate,
        settings.initial_difficulty,
    )
}

/// Push one signed transaction at the local node and the bootstrap peers.
fn gossip_transaction(
    settings: &Settings,
    transaction: &Transaction,
) -> Result<(), Box<dyn std::error::Error>> {
    let message = encode_message(
        OpCode::NewTransaction,
        &NewTransactionPayload {
            transaction: transaction.clone(),
        },
    )?;
    let socket = UdpTransport::bind(0)?;
    let local: SocketAddr = format!("127.0.0.1:{}", settings.port).parse()?;
    let mut targets = settings.bootstrap_addrs()?;
    targets.push(local);
    for target in targets {
        if let Err(e) = socket.send(target, &message) {
            warn!("Could not reach {target}: {e}");
        }
    }
    Ok(())
}

fn start_node(
    settings: &Settings,
    data_dir: &Path,
    passphrase: &str,
    no_mine: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = sled::open(settings.db_path(data_dir))?;
    let engine = Arc::new(open_engine(&db, settings, data_dir)?);

    let (wallet, fresh_wallet) =
        keystore::load_or_create(&settings.wallet_path(data_dir), passphrase)?;
    let miner_address = wallet.get_address();
    info!("Node {} mining to {miner_address}", settings.node_id);

    let transport = Arc::new(UdpTransport::bind(settings.port)?);
    let peers = Arc::new(PeerSet::new(&settings.bootstrap_addrs()?, 8));
    let gossip = GossipNode::new(Arc::clone(&engine), Arc::clone(&transport), Arc::clone(&peers));

    let inbox = transport.start_receiver()?;
    let handler = gossip.clone();
    thread::spawn(move || handler.run(inbox));

    // Join the network: learn peers, then catch up on blocks
    for peer in peers.all()? {
        gossip.request_nodes(peer)?;
        gossip.request_blocks(peer)?;
    }

    // A fresh wallet announces itself so peers provision the account
    if fresh_wallet {
        announce_new_wallet(&engine, &gossip, &wallet)?;
    }

    if no_mine {
        info!("Mining disabled; settling and relaying only");
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }

    let cancel = CancelToken::new();
    loop {
        match engine.produce_block(&miner_address, settings.miner_workers, &cancel) {
            Ok(Some(block)) => {
                if let Err(e) = gossip.announce_block(&block, &miner_address) {
                    warn!("Could not announce block: {e}");
                }
            }
            Ok(None) => thread::sleep(MINE_RETRY_PAUSE),
            Err(e) => {
                error!("Block production failed: {e}");
                thread::sleep(MINE_RETRY_PAUSE);
            }
        }
    }
}

fn announce_new_wallet(
    engine: &Engine,
    gossip: &GossipNode,
    wallet: &Wallet,
) -> embercoin::Result<()> {
    let announcement = wallet.create_wallet_transaction(1);
    engine.submit_transaction(announcement.clone())?;
    gossip.announce_transaction(&announcement)?;
    info!("Announced new wallet {}", wallet.get_address());
    Ok(())
}
