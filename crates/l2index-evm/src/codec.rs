//! Coordinator contract codec: event signatures, log decoding and the
//! proposal calldata layout.
//!
//! ```text
//! NewProposal(uint256 proposalNum, bytes32 blockHash)
//! Finalized(bytes32 blockHash)
//! Slash(bytes32 blockHash, address proposer, string reason)
//! ```
//!
//! All event arguments are non-indexed, so they live in the log data.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use l2index_core::{
    BlockPayload, EventArgs, EventKind, IndexError, PayloadDecoder, RawEvent, RawTx,
};

use crate::error::TransportError;

pub const NEW_PROPOSAL_SIGNATURE: &str = "NewProposal(uint256,bytes32)";
pub const FINALIZED_SIGNATURE: &str = "Finalized(bytes32)";
pub const SLASH_SIGNATURE: &str = "Slash(bytes32,address,string)";

/// Solidity signature of the event backing `kind`.
pub fn signature(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Proposal => NEW_PROPOSAL_SIGNATURE,
        EventKind::Finalize => FINALIZED_SIGNATURE,
        EventKind::Slash => SLASH_SIGNATURE,
    }
}

/// `topic[0]` of the event backing `kind`.
pub fn topic0(kind: EventKind) -> B256 {
    keccak256(signature(kind))
}

// ─── Logs ────────────────────────────────────────────────────────────────────

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: String,
    pub block_hash: Option<B256>,
    #[serde(rename = "transactionHash")]
    pub tx_hash: B256,
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl RawLog {
    pub fn block_number_u64(&self) -> Result<u64, TransportError> {
        parse_hex_u64(&self.block_number)
    }

    pub fn log_index_u32(&self) -> Result<u32, TransportError> {
        let index = parse_hex_u64(&self.log_index)?;
        u32::try_from(index)
            .map_err(|_| TransportError::Decode(format!("log index {index} overflows u32")))
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// Parse a hex quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, TransportError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| TransportError::Decode(format!("bad quantity {s:?}: {e}")))
}

/// Format a u64 as a hex quantity.
pub fn to_hex_quantity(n: u64) -> String {
    format!("{n:#x}")
}

/// Decode a coordinator log of the given kind.
pub fn decode_log(kind: EventKind, log: &RawLog) -> Result<RawEvent, TransportError> {
    match log.topics.first() {
        Some(t0) if *t0 == topic0(kind) => {}
        other => {
            return Err(TransportError::Decode(format!(
                "log {} is not a {} event (topic0 {other:?})",
                log.tx_hash,
                signature(kind)
            )))
        }
    }

    let args = match kind {
        EventKind::Proposal => {
            let values = decode_data(
                &[DynSolType::Uint(256), DynSolType::FixedBytes(32)],
                &log.data,
            )?;
            let (number, _) = values[0].as_uint().ok_or_else(|| shape("proposalNum"))?;
            EventArgs::Proposal {
                proposal_number: u64::try_from(number).map_err(|_| {
                    TransportError::Decode(format!("proposal number {number} overflows u64"))
                })?,
                block_hash: word(&values[1], "blockHash")?,
            }
        }
        EventKind::Finalize => {
            let values = decode_data(&[DynSolType::FixedBytes(32)], &log.data)?;
            EventArgs::Finalize {
                block_hash: word(&values[0], "blockHash")?,
            }
        }
        EventKind::Slash => {
            let values = decode_data(
                &[DynSolType::FixedBytes(32), DynSolType::Address, DynSolType::String],
                &log.data,
            )?;
            EventArgs::Slash {
                block_hash: word(&values[0], "blockHash")?,
                proposer: values[1].as_address().ok_or_else(|| shape("proposer"))?,
                reason: values[2].as_str().ok_or_else(|| shape("reason"))?.to_string(),
            }
        }
    };

    Ok(RawEvent {
        l1_height: log.block_number_u64()?,
        tx_hash: log.tx_hash,
        log_index: log.log_index_u32()?,
        args,
    })
}

fn decode_data(types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>, TransportError> {
    let decoded = DynSolType::Tuple(types.to_vec())
        .abi_decode_params(data)
        .map_err(|e| TransportError::Decode(e.to_string()))?;
    match decoded {
        DynSolValue::Tuple(values) if values.len() == types.len() => Ok(values),
        other => Err(TransportError::Decode(format!("unexpected log data shape: {other:?}"))),
    }
}

fn word(value: &DynSolValue, field: &str) -> Result<B256, TransportError> {
    match value.as_fixed_bytes() {
        Some((bytes, 32)) => Ok(B256::from_slice(bytes)),
        _ => Err(shape(field)),
    }
}

fn shape(field: &str) -> TransportError {
    TransportError::Decode(format!("unexpected type for `{field}`"))
}

// ─── Proposal calldata ───────────────────────────────────────────────────────

/// Length of the header prefix read from a serialized block:
/// `proposer (20 bytes) ++ parentBlock (32 bytes)`.
const HEADER_PREFIX_LEN: usize = 20 + 32;

/// Recovers proposer and parent hash from a `propose(bytes blockData, ...)`
/// transaction.
///
/// The serialized block is the first (dynamic `bytes`) argument; its header
/// starts with the proposer address followed by the parent block hash. The
/// function selector is not checked, so any entry point that takes the block
/// as its first argument decodes the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorPayloadDecoder;

impl CoordinatorPayloadDecoder {
    pub fn decode(&self, input: &[u8]) -> Result<BlockPayload, TransportError> {
        if input.len() < 4 {
            return Err(TransportError::Decode("calldata shorter than a selector".into()));
        }
        let decoded = DynSolType::Tuple(vec![DynSolType::Bytes])
            .abi_decode_params(&input[4..])
            .map_err(|e| TransportError::Decode(format!("block payload: {e}")))?;
        let block = match decoded {
            DynSolValue::Tuple(mut values) if values.len() == 1 => match values.remove(0) {
                DynSolValue::Bytes(bytes) => bytes,
                _ => return Err(shape("blockData")),
            },
            _ => return Err(shape("blockData")),
        };
        if block.len() < HEADER_PREFIX_LEN {
            return Err(TransportError::Decode(format!(
                "serialized block is {} bytes, header needs {HEADER_PREFIX_LEN}",
                block.len()
            )));
        }
        Ok(BlockPayload {
            proposer: Address::from_slice(&block[..20]),
            parent_block_hash: B256::from_slice(&block[20..HEADER_PREFIX_LEN]),
        })
    }
}

impl PayloadDecoder for CoordinatorPayloadDecoder {
    fn decode_payload(&self, tx: &RawTx) -> Result<BlockPayload, IndexError> {
        self.decode(&tx.input).map_err(|e| {
            IndexError::SourceUnavailable(format!("transaction {}: {e}", tx.hash))
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
