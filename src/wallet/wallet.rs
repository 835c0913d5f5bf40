use crate::core::transaction::{Transaction, TxCommand};
use crate::error::Result;
use crate::utils::{new_key_pair, public_key_from_pkcs8, ripemd160_digest, sha256_digest};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

/// An ECDSA P-256 keypair and the address derived from it.
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = new_key_pair()?;
        let public_key = public_key_from_pkcs8(&pkcs8)?;
        Ok(Wallet { pkcs8, public_key })
    }

    /// Address: `0x` + hex of RIPEMD160(SHA256(public key)).
    pub fn get_address(&self) -> String {
        let digest = ripemd160_digest(&sha256_digest(&self.public_key));
        format!("0x{}", HEXLOWER.encode(&digest))
    }

    pub fn get_public_key_hex(&self) -> String {
        HEXLOWER.encode(&self.public_key)
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        &self.pkcs8
    }

    /// The CreateWallet announcement a fresh node broadcasts so peers can
    /// provision its account.
    pub fn create_wallet_transaction(&self, nonce: u32) -> Transaction {
        Transaction::new_command_only(
            &self.get_address(),
            &self.get_public_key_hex(),
            nonce,
            vec![TxCommand::CreateWallet],
        )
    }

    /// Sign a transfer from this wallet's address.
    pub fn sign_transfer(&self, to: &str, amount: f64, nonce: u32) -> Result<Transaction> {
        Transaction::new_signed(
            to,
            &self.get_address(),
            &self.get_public_key_hex(),
            amount,
            nonce,
            vec![],
            &self.pkcs8,
        )
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.get_address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_prefixed_ripemd_hex() {
        let wallet = Wallet::new().unwrap();
        let address = wallet.get_address();

        assert!(address.starts_with("0x"));
        // 2 prefix chars + 20 RIPEMD-160 bytes in hex
        assert_eq!(address.len(), 42);
    }

    #[test]
    fn test_address_is_stable_for_a_key() {
        let wallet = Wallet::new().unwrap();
        assert_eq!(wallet.get_address(), wallet.get_address());
    }

    #[test]
    fn test_signed_transfer_verifies() {
        let wallet = Wallet::new().unwrap();
        let tx = wallet.sign_transfer("0xdest", 10.0, 1).unwrap();

        assert!(tx.verify_hash());
        assert!(tx.verify_signature());
        assert_eq!(tx.get_from(), wallet.get_address());
    }

    #[test]
    fn test_create_wallet_transaction_carries_the_command() {
        let wallet = Wallet::new().unwrap();
        let tx = wallet.create_wallet_transaction(1);

        assert!(tx.is_command_only());
        assert_eq!(tx.get_commands(), &[TxCommand::CreateWallet]);
        assert_eq!(tx.get_from_pub_key(), wallet.get_public_key_hex());
    }
}
