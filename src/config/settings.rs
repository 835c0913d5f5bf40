// Node configuration: one JSON file under the data directory. A missing file
// is created with defaults on first start so a bare `embercoin start` works.

use crate::error::{NodeError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_PORT: u16 = 9444;
pub const DEFAULT_FEE_RATE: f64 = 0.001;
pub const DEFAULT_DIFFICULTY: u16 = 4;
pub const CONFIG_FILE: &str = "config.json";
const DATA_DIR_NAME: &str = ".embercoin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// UDP port the gossip transport binds
    pub port: u16,
    /// Peers contacted at startup
    pub bootstrap_peers: Vec<String>,
    /// Fraction of each transfer charged as fee
    pub fee_rate: f64,
    /// Difficulty used until retargeting adjusts it
    pub initial_difficulty: u16,
    /// Stable identity of this node
    pub node_id: Uuid,
    /// Hash-search worker threads
    pub miner_workers: usize,
    /// Wallet file, relative to the data directory
    pub wallet_file: String,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            port: DEFAULT_PORT,
            bootstrap_peers: Vec::new(),
            fee_rate: DEFAULT_FEE_RATE,
            initial_difficulty: DEFAULT_DIFFICULTY,
            node_id: Uuid::new_v4(),
            miner_workers: 4,
            wallet_file: "wallet.dat".to_string(),
        }
    }
}

impl Settings {
    /// The data directory: `~/.embercoin`, or the current directory when no
    /// home is set.
    pub fn default_data_dir() -> PathBuf {
        match env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(DATA_DIR_NAME),
            None => PathBuf::from(DATA_DIR_NAME),
        }
    }

    /// Load the settings from `data_dir`, writing a fresh default file when
    /// none exists yet.
    pub fn load_or_create(data_dir: &Path) -> Result<Settings> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| NodeError::Config(format!("Failed to read {CONFIG_FILE}: {e}")))?;
            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| NodeError::Config(format!("Malformed {CONFIG_FILE}: {e}")))?;
            settings.validate()?;
            Ok(settings)
        } else {
            let settings = Settings::default();
            settings.save(data_dir)?;
            info!("Created default configuration at {}", path.display());
            Ok(settings)
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(data_dir.join(CONFIG_FILE), contents)
            .map_err(|e| NodeError::Config(format!("Failed to write {CONFIG_FILE}: {e}")))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(NodeError::Config(format!(
                "fee_rate {} must be in [0, 1)",
                self.fee_rate
            )));
        }
        if self.initial_difficulty == 0 || self.initial_difficulty > 64 {
            return Err(NodeError::Config(format!(
                "initial_difficulty {} must be in 1..=64",
                self.initial_difficulty
            )));
        }
        Ok(())
    }

    /// Bootstrap peers parsed to socket addresses; malformed entries are a
    /// configuration error, not a silent skip.
    pub fn bootstrap_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.bootstrap_peers
            .iter()
            .map(|peer| {
                peer.parse::<SocketAddr>()
                    .map_err(|e| NodeError::Config(format!("Invalid bootstrap peer {peer}: {e}")))
            })
            .collect()
    }

    pub fn wallet_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.wallet_file)
    }

    pub fn blocks_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join("blocks")
    }

    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join("db")
    }
}
