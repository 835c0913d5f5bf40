// Account-model transaction: a signed value transfer plus optional protocol
// commands. The content hash covers the immutable fields only; status and fee
// are assigned later by settlement.

use crate::error::{NodeError, Result};
use crate::utils::{ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, sha256_hex};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

pub const TRANSACTION_VERSION: u16 = 1;

/// Sender address of synthetic reward transactions
pub const COINBASE_SENDER: &str = "COINBASE";
/// Receiver address of transactions that only carry commands
pub const COMMAND_ONLY_RECEIVER: &str = "CMDONLY";

/// Settlement outcome of a transaction
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum TxStatus {
    Pending,
    Success,
    Reject,
}

impl TxStatus {
    pub fn to_u16(self) -> u16 {
        match self {
            TxStatus::Pending => 0,
            TxStatus::Success => 1,
            TxStatus::Reject => 2,
        }
    }

    pub fn from_u16(raw: u16) -> Result<TxStatus> {
        match raw {
            0 => Ok(TxStatus::Pending),
            1 => Ok(TxStatus::Success),
            2 => Ok(TxStatus::Reject),
            other => Err(NodeError::Transaction(format!(
                "Unknown transaction status: {other}"
            ))),
        }
    }
}

/// Protocol-level side effects a transaction can carry.
///
/// A closed enum: an unknown opcode coming off the wire is an error, never
/// silently skipped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum TxCommand {
    /// Provision a zero-balance account for the sender's address and pubkey
    CreateWallet,
}

impl TxCommand {
    pub fn opcode(self) -> u16 {
        match self {
            TxCommand::CreateWallet => 0x0,
        }
    }

    pub fn from_opcode(opcode: u16) -> Result<TxCommand> {
        match opcode {
            0x0 => Ok(TxCommand::CreateWallet),
            other => Err(NodeError::Transaction(format!(
                "Unknown command opcode: {other:#x}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    version: u16,
    to: String,
    from: String,
    from_pub_key: String,
    amount: f64,
    signature: String,
    nonce: u32,
    fee: f64,
    commands: Vec<TxCommand>,
    status: TxStatus,
    transaction_hash: String,
}

/// Render a coin amount the way it enters the hash preimage.
///
/// Plain decimal with no trailing zeros ("100", "0.1"). Every node must
/// produce the identical string or content hashes diverge across the network.
pub fn format_amount(amount: f64) -> String {
    format!("{amount}")
}

impl Transaction {
    /// Create and sign a transfer. `pkcs8` is the sender's private key; the
    /// signature covers the content hash.
    pub fn new_signed(
        to: &str,
        from: &str,
        from_pub_key: &str,
        amount: f64,
        nonce: u32,
        commands: Vec<TxCommand>,
        pkcs8: &[u8],
    ) -> Result<Transaction> {
        let mut tx = Transaction::assemble(to, from, from_pub_key, amount, nonce, commands);
        let signature = ecdsa_p256_sha256_sign_digest(pkcs8, tx.transaction_hash.as_bytes())?;
        tx.signature = HEXLOWER.encode(&signature);
        Ok(tx)
    }

    /// The synthetic reward transaction paying a miner. Unsigned; settlement
    /// exempts the COINBASE sender from signature and account checks.
    pub fn new_coinbase(miner: &str, amount: f64, nonce: u32) -> Transaction {
        Transaction::assemble(miner, COINBASE_SENDER, "", amount, nonce, vec![])
    }

    /// A transaction whose only purpose is command execution (amount 0).
    pub fn new_command_only(
        from: &str,
        from_pub_key: &str,
        nonce: u32,
        commands: Vec<TxCommand>,
    ) -> Transaction {
        Transaction::assemble(COMMAND_ONLY_RECEIVER, from, from_pub_key, 0.0, nonce, commands)
    }

    /// Rebuild a transaction received from a peer or read from the block log.
    /// The claimed hash is kept as-is; settlement recomputes and compares.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        version: u16,
        to: String,
        from: String,
        from_pub_key: String,
        amount: f64,
        signature: String,
        nonce: u32,
        fee: f64,
        commands: Vec<TxCommand>,
        status: TxStatus,
        transaction_hash: String,
    ) -> Transaction {
        Transaction {
            version,
            to,
            from,
            from_pub_key,
            amount,
            signature,
            nonce,
            fee,
            commands,
            status,
            transaction_hash,
        }
    }

    fn assemble(
        to: &str,
        from: &str,
        from_pub_key: &str,
        amount: f64,
        nonce: u32,
        commands: Vec<TxCommand>,
    ) -> Transaction {
        let mut tx = Transaction {
            version: TRANSACTION_VERSION,
            to: to.to_string(),
            from: from.to_string(),
            from_pub_key: from_pub_key.to_string(),
            amount,
            signature: String::new(),
            nonce,
            fee: 0.0,
            commands,
            status: TxStatus::Pending,
            transaction_hash: String::new(),
        };
        tx.transaction_hash = tx.compute_hash();
        tx
    }

    /// Content hash: SHA-256 over the decimal-string concatenation of the
    /// immutable fields, no delimiters.
    pub fn compute_hash(&self) -> String {
        let preimage = format!(
            "{}{}{}{}{}{}",
            self.version,
            self.to,
            self.from,
            self.from_pub_key,
            format_amount(self.amount),
            self.nonce
        );
        sha256_hex(&preimage)
    }

    /// Does the claimed hash match the recomputed one?
    pub fn verify_hash(&self) -> bool {
        self.transaction_hash == self.compute_hash()
    }

    /// Verify the EC signature against the content hash and the sender's
    /// embedded public key. Fails closed on any malformed hex.
    pub fn verify_signature(&self) -> bool {
        if self.signature.is_empty() || self.from_pub_key.is_empty() {
            return false;
        }
        let pubkey = match HEXLOWER.decode(self.from_pub_key.as_bytes()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let signature = match HEXLOWER.decode(self.signature.as_bytes()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        ecdsa_p256_sha256_sign_verify(&pubkey, &signature, self.transaction_hash.as_bytes())
    }

    pub fn is_coinbase(&self) -> bool {
        self.from == COINBASE_SENDER
    }

    pub fn is_command_only(&self) -> bool {
        self.to == COMMAND_ONLY_RECEIVER && self.amount == 0.0
    }

    pub fn get_version(&self) -> u16 {
        self.version
    }

    pub fn get_to(&self) -> &str {
        &self.to
    }

    pub fn get_from(&self) -> &str {
        &self.from
    }

    pub fn get_from_pub_key(&self) -> &str {
        &self.from_pub_key
    }

    pub fn get_amount(&self) -> f64 {
        self.amount
    }

    pub fn get_signature(&self) -> &str {
        &self.signature
    }

    pub fn get_nonce(&self) -> u32 {
        self.nonce
    }

    pub fn get_fee(&self) -> f64 {
        self.fee
    }

    pub fn get_commands(&self) -> &[TxCommand] {
        &self.commands
    }

    pub fn get_status(&self) -> TxStatus {
        self.status
    }

    pub fn get_hash(&self) -> &str {
        &self.transaction_hash
    }

    // Settlement-only mutators. Everything hashed stays frozen.
    pub fn set_status(&mut self, status: TxStatus) {
        self.status = status;
    }

    pub fn set_fee(&mut self, fee: f64) {
        self.fee = fee;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{new_key_pair, public_key_from_pkcs8};

    fn keyed_transaction(amount: f64) -> (Transaction, Vec<u8>) {
        let pkcs8 = new_key_pair().unwrap();
        let pubkey = HEXLOWER.encode(&public_key_from_pkcs8(&pkcs8).unwrap());
        let tx =
            Transaction::new_signed("0xdest", "0xsender", &pubkey, amount, 1, vec![], &pkcs8)
                .unwrap();
        (tx, pkcs8)
    }

    #[test]
    fn test_hash_covers_immutable_fields_only() {
        let (mut tx, _) = keyed_transaction(100.0);
        let hash_before = tx.get_hash().to_string();

        tx.set_fee(0.1);
        tx.set_status(TxStatus::Success);

        assert!(tx.verify_hash());
        assert_eq!(tx.get_hash(), hash_before);
    }

    #[test]
    fn test_amount_formatting_is_plain_decimal() {
        assert_eq!(format_amount(100.0), "100");
        assert_eq!(format_amount(0.1), "0.1");
        assert_eq!(format_amount(899.9), "899.9");
    }

    #[test]
    fn test_signature_verifies() {
        let (tx, _) = keyed_transaction(42.0);
        assert!(tx.verify_signature());
    }

    #[test]
    fn test_forged_signature_fails() {
        let (tx, _) = keyed_transaction(42.0);
        let other_key = new_key_pair().unwrap();
        let forged_sig =
            ecdsa_p256_sha256_sign_digest(&other_key, tx.get_hash().as_bytes()).unwrap();

        let forged = Transaction::from_parts(
            tx.get_version(),
            tx.get_to().to_string(),
            tx.get_from().to_string(),
            tx.get_from_pub_key().to_string(),
            tx.get_amount(),
            HEXLOWER.encode(&forged_sig),
            tx.get_nonce(),
            0.0,
            vec![],
            TxStatus::Pending,
            tx.get_hash().to_string(),
        );
        assert!(!forged.verify_signature());
    }

    #[test]
    fn test_coinbase_and_command_only_markers() {
        let coinbase = Transaction::new_coinbase("0xminer", 1001.0, 1);
        assert!(coinbase.is_coinbase());
        assert!(!coinbase.is_command_only());

        let cmd = Transaction::new_command_only("0xnew", "ab", 1, vec![TxCommand::CreateWallet]);
        assert!(cmd.is_command_only());
        assert_eq!(cmd.get_commands(), &[TxCommand::CreateWallet]);
    }

    #[test]
    fn test_unknown_command_opcode_is_rejected() {
        assert!(TxCommand::from_opcode(0x0).is_ok());
        assert!(TxCommand::from_opcode(0x7f).is_err());
    }
}
