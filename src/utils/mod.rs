//! Utility functions and helpers
//!
//! This module contains cryptographic utilities, deterministic math helpers,
//! and serialization functions used throughout the node.

pub mod crypto;
pub mod math;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair,
    public_key_from_pkcs8, ripemd160_digest, sha256_digest, sha256_hex,
};
pub use math::{floor_to_fee_precision, mean};
pub use serialization::{deserialize, serialize};
