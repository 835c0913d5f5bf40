use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "embercoin")]
pub struct Opt {
    /// Data directory; defaults to ~/.embercoin
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Create an encrypted wallet")]
    CreateWallet {
        #[arg(long, env = "EMBERCOIN_PASSPHRASE", help = "Wallet passphrase")]
        passphrase: String,
    },
    #[command(name = "getbalance", about = "Print the balance of an address")]
    GetBalance {
        #[arg(help = "The account address")]
        address: String,
    },
    #[command(name = "send", about = "Sign a transfer and gossip it to the network")]
    Send {
        #[arg(help = "Receiver address")]
        to: String,
        #[arg(help = "Amount of coins")]
        amount: f64,
        #[arg(long, env = "EMBERCOIN_PASSPHRASE", help = "Wallet passphrase")]
        passphrase: String,
        #[arg(long, help = "Sender nonce; defaults to the locally stored nonce + 1")]
        nonce: Option<u32>,
    },
    #[command(name = "printchain", about = "Print every mainchain block")]
    PrintChain,
    #[command(name = "start", about = "Run the node: gossip, settle, and mine")]
    Start {
        #[arg(long, env = "EMBERCOIN_PASSPHRASE", help = "Wallet passphrase")]
        passphrase: String,
        #[arg(long, help = "Participate in gossip without mining")]
        no_mine: bool,
    },
}
