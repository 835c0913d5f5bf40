// Persistence: the account ledger and the indexes live in sled; full blocks
// live in the append-structured block log.

pub mod accounts;
pub mod block_index;
pub mod block_log;
pub mod tx_index;

pub use accounts::{Account, AccountStore, LedgerStage};
pub use block_index::{BlockIndex, BlockLocation};
pub use block_log::{decode_record, encode_record, BlockLog, BlockRecord, LogPosition};
pub use tx_index::{TxIndex, TxLocation};
