// Proof-of-work rules: the difficulty check, the header hash preimage, and
// the coinbase schedule. These are consensus-critical; every node must agree.

use crate::utils::sha256_hex;

/// Initial per-block subsidy before halving
pub const BASE_REWARD: u64 = 1000;
/// Floor added on top of the halving schedule so rewards never reach zero
pub const MINIMUM_REWARD: u64 = 1;
/// Block interval between halvings
pub const HALVING_INTERVAL: u32 = 10_000;
/// Confirmations before a mined block's reward is paid out
pub const COINBASE_MATURITY: u32 = 10;

/// Difficulty check: the hash must be 64 hex characters, and the number of
/// '0' characters among the first `difficulty` characters must equal
/// `difficulty` exactly. Note this counts zero characters inside the window
/// rather than measuring a leading-zero prefix; the distinction is part of
/// the consensus rules and must not be "fixed" to a >= comparison.
pub fn check_proof_of_work(hash: &str, difficulty: u16) -> bool {
    if hash.len() < 64 || difficulty as usize > hash.len() {
        return false;
    }

    let window = &hash[..difficulty as usize];
    let zero_chars = window.chars().filter(|c| *c == '0').count();
    zero_chars == difficulty as usize
}

/// Header hash preimage: decimal-string concatenation of the header fields,
/// no delimiters. Identical on every node or announced blocks never verify.
pub fn block_hash_preimage(
    version: u16,
    height: u32,
    previous_hash: &str,
    merkle_root: &str,
    timestamp: i64,
    difficulty: u16,
) -> String {
    format!("{version}{height}{previous_hash}{merkle_root}{timestamp}{difficulty}")
}

/// Hash a block header with a concrete nonce.
pub fn block_hash(preimage: &str, nonce: i64) -> String {
    sha256_hex(&format!("{preimage}{nonce}"))
}

/// Subsidy for the block mined at `height`: halves every 10,000 blocks with a
/// fixed floor of 1. Paid out COINBASE_MATURITY blocks later, together with
/// the fees that block collected.
pub fn coinbase_reward(height: u32) -> f64 {
    if height == 0 {
        return 0.0;
    }
    let halvings = (height - 1) / HALVING_INTERVAL;
    let subsidy = if halvings >= 64 {
        0
    } else {
        BASE_REWARD >> halvings
    };
    (subsidy + MINIMUM_REWARD) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow_accepts_all_zero_window() {
        let hash = format!("{}{}", "000", "a".repeat(61));
        assert!(check_proof_of_work(&hash, 3));
    }

    #[test]
    fn test_pow_rejects_partial_zero_window() {
        // 2 zeros inside a 3-char window is not enough
        let hash = format!("{}{}", "0a0", "b".repeat(61));
        assert!(!check_proof_of_work(&hash, 3));
    }

    #[test]
    fn test_pow_window_ignores_later_characters() {
        // Only the first `difficulty` characters are examined
        let hash = format!("{}{}", "00", "0".repeat(62));
        assert!(check_proof_of_work(&hash, 2));
    }

    #[test]
    fn test_pow_rejects_short_hash() {
        assert!(!check_proof_of_work("000", 3));
    }

    #[test]
    fn test_pow_rejects_difficulty_beyond_hash_length() {
        // Difficulty arrives unvalidated off the wire; a window wider than
        // the hash must fail, not slice out of bounds
        assert!(!check_proof_of_work(&"a".repeat(64), 65));
        assert!(!check_proof_of_work(&"a".repeat(64), u16::MAX));
        assert!(check_proof_of_work(&"0".repeat(64), 64));
    }

    #[test]
    fn test_pow_zero_difficulty_accepts_any_full_hash() {
        let hash = "f".repeat(64);
        assert!(check_proof_of_work(&hash, 0));
    }

    #[test]
    fn test_block_hash_is_deterministic() {
        let preimage = block_hash_preimage(1, 5, "prev", "root", 1_700_000_000, 4);
        assert_eq!(block_hash(&preimage, 42), block_hash(&preimage, 42));
        assert_ne!(block_hash(&preimage, 42), block_hash(&preimage, 43));
    }

    #[test]
    fn test_coinbase_reward_schedule() {
        assert_eq!(coinbase_reward(1), 1001.0);
        assert_eq!(coinbase_reward(10_000), 1001.0);
        assert_eq!(coinbase_reward(10_001), 501.0);
        assert_eq!(coinbase_reward(20_001), 251.0);
        // Floor holds after the subsidy shifts to nothing
        assert_eq!(coinbase_reward(1_000_001), 1.0);
    }

    #[test]
    fn test_genesis_has_no_reward() {
        assert_eq!(coinbase_reward(0), 0.0);
    }
}
