// Encrypted wallet file. The keypair is sealed with AES-256-GCM under a key
// derived from the passphrase with Argon2id; key material is zeroized on drop.

use crate::error::{NodeError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::wallet::Wallet;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use zeroize::ZeroizeOnDrop;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const SALT_LEN: usize = 32;
const MIN_PASSPHRASE_LEN: usize = 8;

/// Derived key wrapper that zeros its memory on drop
#[derive(Clone, ZeroizeOnDrop)]
struct SecureKey {
    key: Vec<u8>,
}

/// On-disk keystore container
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
struct SealedWallet {
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    salt: Vec<u8>,
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<SecureKey> {
    let params = Params::new(65536, 3, 1, Some(KEY_LEN))
        .map_err(|e| NodeError::Encryption(format!("Invalid Argon2 parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = vec![0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| NodeError::Encryption(format!("Key derivation failed: {e}")))?;
    Ok(SecureKey { key })
}

fn cipher_for(key: &SecureKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.key))
}

fn validate_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.len() < MIN_PASSPHRASE_LEN {
        return Err(NodeError::Encryption(format!(
            "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters long"
        )));
    }
    Ok(())
}

/// Seal the wallet under the passphrase and write it to `path`.
pub fn save_wallet(path: &Path, wallet: &Wallet, passphrase: &str) -> Result<()> {
    validate_passphrase(passphrase)?;

    let mut salt = vec![0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut nonce = vec![0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt)?;
    let plaintext = serialize(wallet)?;
    let ciphertext = cipher_for(&key)
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|e| NodeError::Encryption(format!("Wallet encryption failed: {e}")))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let sealed = SealedWallet {
        ciphertext,
        nonce,
        salt,
    };
    fs::write(path, serialize(&sealed)?)?;
    Ok(())
}

/// Load and unseal the wallet at `path`. A wrong passphrase fails the GCM
/// authentication check and surfaces as an encryption error.
pub fn load_wallet(path: &Path, passphrase: &str) -> Result<Wallet> {
    let contents = fs::read(path)
        .map_err(|e| NodeError::Wallet(format!("Failed to read wallet file: {e}")))?;
    let sealed: SealedWallet = deserialize(&contents)?;

    let key = derive_key(passphrase, &sealed.salt)?;
    let plaintext = cipher_for(&key)
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|e| NodeError::Encryption(format!("Wallet decryption failed: {e}")))?;
    deserialize(&plaintext)
}

/// Load the wallet if the file exists, otherwise create one and seal it.
/// Returns the wallet and whether it was freshly created.
pub fn load_or_create(path: &Path, passphrase: &str) -> Result<(Wallet, bool)> {
    if path.exists() {
        Ok((load_wallet(path, passphrase)?, false))
    } else {
        let wallet = Wallet::new()?;
        save_wallet(path, &wallet, passphrase)?;
        Ok((wallet, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sealed_wallet_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        let wallet = Wallet::new().unwrap();

        save_wallet(&path, &wallet, "correct horse").unwrap();
        let loaded = load_wallet(&path, "correct horse").unwrap();

        assert_eq!(loaded.get_address(), wallet.get_address());
        assert_eq!(loaded.get_pkcs8(), wallet.get_pkcs8());
    }

    #[test]
    fn test_wrong_passphrase_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        save_wallet(&path, &Wallet::new().unwrap(), "correct horse").unwrap();

        assert!(load_wallet(&path, "wrong horse!").is_err());
    }

    #[test]
    fn test_short_passphrase_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        let result = save_wallet(&path, &Wallet::new().unwrap(), "short");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_create_reports_freshness() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.dat");

        let (first, created) = load_or_create(&path, "correct horse").unwrap();
        assert!(created);
        let (second, created) = load_or_create(&path, "correct horse").unwrap();
        assert!(!created);
        assert_eq!(first.get_address(), second.get_address());
    }
}
