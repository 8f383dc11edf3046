//! Scanner configuration and orchestrator state types.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::types::RangeOverride;

/// Proposal number of the first block proposed after genesis.
/// Reaching it ends a backward proposal scan.
pub const GENESIS_PROPOSAL_NUMBER: u64 = 1;

/// Default maximum number of blocks per `eth_getLogs` call.
pub const DEFAULT_SPAN: u64 = 10_000;

/// Configuration for one scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Coordinator contract whose events are indexed.
    pub contract: Address,
    /// Maximum block span per log query. Provider-dependent, never discovered.
    pub span: u64,
    /// Range to resolve during `init`.
    pub range: RangeOverride,
    /// Proposal number that stops a backward proposal scan.
    pub genesis_proposal_number: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            contract: Address::ZERO,
            span: DEFAULT_SPAN,
            range: RangeOverride::default(),
            genesis_proposal_number: GENESIS_PROPOSAL_NUMBER,
        }
    }
}

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerState {
    /// `init` has not completed yet.
    Uninitialized,
    /// Range resolved, contract verified; no pass running.
    Ready,
    /// At least one update pass is in flight.
    Scanning,
}

impl std::fmt::Display for IndexerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Scanning => write!(f, "scanning"),
        }
    }
}
