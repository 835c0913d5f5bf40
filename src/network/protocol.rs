// Wire format: every datagram is an 8-byte header (opcode, protocol version,
// 4 reserved bytes) followed by a JSON payload.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::error::{NodeError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u16 = 1;
pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    FoundBlockHash,
    NewTransaction,
    RequestNodesList,
    AnswerNodesList,
    RequestBlocks,
    EndBlocks,
}

impl OpCode {
    pub fn to_u16(self) -> u16 {
        match self {
            OpCode::FoundBlockHash => 0x1,
            OpCode::NewTransaction => 0x2,
            OpCode::RequestNodesList => 0x3,
            OpCode::AnswerNodesList => 0x4,
            OpCode::RequestBlocks => 0x5,
            OpCode::EndBlocks => 0x6,
        }
    }

    pub fn from_u16(raw: u16) -> Result<OpCode> {
        match raw {
            0x1 => Ok(OpCode::FoundBlockHash),
            0x2 => Ok(OpCode::NewTransaction),
            0x3 => Ok(OpCode::RequestNodesList),
            0x4 => Ok(OpCode::AnswerNodesList),
            0x5 => Ok(OpCode::RequestBlocks),
            0x6 => Ok(OpCode::EndBlocks),
            other => Err(NodeError::Network(format!(
                "Unknown gossip opcode: {other:#x}"
            ))),
        }
    }
}

/// A freshly mined or relayed block. `private` marks replay traffic that must
/// not be re-forwarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundBlockPayload {
    pub block: Block,
    pub miner: String,
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionPayload {
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesListPayload {
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBlocksPayload {
    /// Requester's current chain height; the reply starts above it
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyPayload {}

/// Frame one message: header plus JSON body.
pub fn encode_message<T: Serialize>(opcode: OpCode, payload: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    let mut message = Vec::with_capacity(HEADER_LEN + body.len());
    message.extend_from_slice(&opcode.to_u16().to_be_bytes());
    message.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    message.extend_from_slice(&[0u8; 4]);
    message.extend_from_slice(&body);
    Ok(message)
}

/// Split a datagram into its opcode and payload bytes, rejecting short or
/// version-mismatched frames.
pub fn decode_header(datagram: &[u8]) -> Result<(OpCode, &[u8])> {
    if datagram.len() < HEADER_LEN {
        return Err(NodeError::Network(format!(
            "Datagram of {} bytes is shorter than the header",
            datagram.len()
        )));
    }
    let opcode = OpCode::from_u16(u16::from_be_bytes([datagram[0], datagram[1]]))?;
    let version = u16::from_be_bytes([datagram[2], datagram[3]]);
    if version != PROTOCOL_VERSION {
        return Err(NodeError::Network(format!(
            "Unsupported protocol version {version}"
        )));
    }
    Ok((opcode, &datagram[HEADER_LEN..]))
}

pub fn decode_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}
