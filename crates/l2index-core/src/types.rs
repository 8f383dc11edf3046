//! Shared types for the scanning pipeline.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// 32-byte hash used for L2 block hashes and L1 transaction hashes.
pub type Hash = B256;

// ─── EventKind / EventFilter ─────────────────────────────────────────────────

/// The three coordinator events the index is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A new L2 block was proposed.
    Proposal,
    /// A proposed block passed its challenge period and was finalized.
    Finalize,
    /// A proposed block was successfully challenged.
    Slash,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [Self::Proposal, Self::Finalize, Self::Slash];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposal => write!(f, "proposal"),
            Self::Finalize => write!(f, "finalize"),
            Self::Slash => write!(f, "slash"),
        }
    }
}

/// Which logs to query: one event kind emitted by one contract.
///
/// The core never builds the wire encoding of a filter (topic hashes);
/// the data source translates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Address of the coordinator contract.
    pub address: Address,
    /// Event kind to match.
    pub kind: EventKind,
}

impl EventFilter {
    pub fn new(address: Address, kind: EventKind) -> Self {
        Self { address, kind }
    }

    /// Filter for `Proposal` events of `address`.
    pub fn proposals(address: Address) -> Self {
        Self::new(address, EventKind::Proposal)
    }

    /// Filter for `Finalize` events of `address`.
    pub fn finalizations(address: Address) -> Self {
        Self::new(address, EventKind::Finalize)
    }

    /// Filter for `Slash` events of `address`.
    pub fn slashes(address: Address) -> Self {
        Self::new(address, EventKind::Slash)
    }
}

// ─── Ranges ──────────────────────────────────────────────────────────────────

/// An inclusive L1 block range `[lower_bound, upper_bound]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    pub lower_bound: u64,
    pub upper_bound: u64,
}

impl ScanRange {
    /// Create a range, rejecting inverted bounds.
    pub fn new(lower_bound: u64, upper_bound: u64) -> Result<Self, IndexError> {
        if lower_bound > upper_bound {
            return Err(IndexError::InvalidRange {
                from: lower_bound,
                to: upper_bound,
            });
        }
        Ok(Self {
            lower_bound,
            upper_bound,
        })
    }

    /// Returns `true` if `height` lies inside the range.
    pub fn contains(&self, height: u64) -> bool {
        self.lower_bound <= height && height <= self.upper_bound
    }

    /// Number of blocks covered.
    pub fn block_count(&self) -> u64 {
        self.upper_bound - self.lower_bound + 1
    }

    /// Narrow this range with an optional per-pass override.
    ///
    /// `from` replaces the lower bound; `to` replaces the upper bound but can
    /// never extend past it.
    pub fn narrow(&self, over: &RangeOverride) -> Result<Self, IndexError> {
        let lower = over.from.unwrap_or(self.lower_bound);
        let upper = over.to.map_or(self.upper_bound, |to| to.min(self.upper_bound));
        Self::new(lower, upper)
    }
}

/// Optional bounds supplied by a caller (`{from?, to?}`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeOverride {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl RangeOverride {
    /// No override: use the full resolved range.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn starting_at(from: u64) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn ending_at(to: u64) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    pub fn between(from: u64, to: u64) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }
}

// ─── Raw chain data ──────────────────────────────────────────────────────────

/// Decoded arguments of a coordinator event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventArgs {
    Proposal {
        proposal_number: u64,
        block_hash: Hash,
    },
    Finalize {
        block_hash: Hash,
    },
    Slash {
        block_hash: Hash,
        proposer: Address,
        reason: String,
    },
}

impl EventArgs {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Proposal { .. } => EventKind::Proposal,
            Self::Finalize { .. } => EventKind::Finalize,
            Self::Slash { .. } => EventKind::Slash,
        }
    }

    /// The L2 block hash the event refers to.
    pub fn block_hash(&self) -> Hash {
        match self {
            Self::Proposal { block_hash, .. }
            | Self::Finalize { block_hash }
            | Self::Slash { block_hash, .. } => *block_hash,
        }
    }
}

/// A log returned by the data source, with its arguments already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// L1 block the log was emitted in.
    pub l1_height: u64,
    /// L1 transaction that emitted the log.
    pub tx_hash: Hash,
    /// Position of the log inside its L1 block.
    pub log_index: u32,
    pub args: EventArgs,
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        self.args.kind()
    }

    /// L2 proposal number, for `Proposal` events only.
    pub fn proposal_number(&self) -> Option<u64> {
        match self.args {
            EventArgs::Proposal {
                proposal_number, ..
            } => Some(proposal_number),
            _ => None,
        }
    }
}

/// An L1 transaction, as far as parent-block recovery needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTx {
    pub hash: Hash,
    pub block_number: Option<u64>,
    pub from: Address,
    pub to: Option<Address>,
    /// Calldata carrying the serialized L2 block.
    pub input: Bytes,
}

/// Header fields recovered from a proposal's block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    pub proposer: Address,
    pub parent_block_hash: Hash,
}

/// On-chain identity of the coordinator contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub address: Address,
    pub chain_id: u64,
    pub code_hash: Hash,
    pub code_size: usize,
}

impl ContractConfig {
    /// `true` when no contract code lives at the address.
    pub fn is_empty(&self) -> bool {
        self.code_size == 0
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
