//! l2index-core: rebuilds an L2 block index from L1 coordinator logs.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator (init → update_proposals / update_finalize / update_slash)
//!      ├── RangeScanner     (backward, span-limited log windows + stop predicate)
//!      ├── EventCorrelator  (proposal / finalize / slash → index, either order)
//!      ├── BlockIndex       (hash-keyed proposals, latest/oldest, children)
//!      └── ChainDataSource  (height, contract config, logs, transactions)
//! ```

pub mod correlator;
pub mod devnet;
pub mod error;
pub mod index;
pub mod indexer;
pub mod orchestrator;
pub mod scanner;
pub mod snapshot;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use correlator::EventCorrelator;
pub use error::IndexError;
pub use index::{BlockIndex, FinalizeRecord, IndexSummary, Proposal, ProposalSet, SlashRecord};
pub use indexer::{IndexerConfig, IndexerState, DEFAULT_SPAN, GENESIS_PROPOSAL_NUMBER};
pub use orchestrator::{Orchestrator, PassReport, SyncReport};
pub use scanner::{Batch, RangeScanner, ScanWalk};
pub use source::{ChainDataSource, PayloadDecoder};
pub use types::{
    BlockPayload, ContractConfig, EventArgs, EventFilter, EventKind, Hash, RangeOverride, RawEvent,
    RawTx, ScanRange,
};
