// Binary codec for everything persisted through sled and the sealed wallet
// file. One bincode configuration everywhere; a value that decodes with
// leftover bytes is treated as corrupt, not silently accepted.

use crate::error::{NodeError, Result};
use serde::{Deserialize, Serialize};

pub fn serialize<T: Serialize + bincode::Encode>(value: &T) -> Result<Vec<u8>> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| NodeError::Serialization(format!("Failed to encode value: {e}")))
}

/// Decode a value written by [`serialize`]. The whole buffer must be
/// consumed; trailing bytes mean the stored entry was truncated or mixed up
/// with another record.
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let (value, consumed) = bincode::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| NodeError::Serialization(format!("Failed to decode value: {e}")))?;
    if consumed != bytes.len() {
        return Err(NodeError::Serialization(format!(
            "Corrupt entry: {consumed} of {} bytes decoded",
            bytes.len()
        )));
    }
    Ok(value)
}
