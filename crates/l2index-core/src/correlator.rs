//! Folds raw coordinator events into the block index.
//!
//! Proposals, finalizations and slashes are scanned independently, so a
//! `Finalize` or `Slash` event can be seen before the proposal it refers to.
//! Both are always recorded; whichever side arrives second completes the
//! merge. Applying the events in either order yields the same index.

use crate::error::IndexError;
use crate::index::{BlockIndex, FinalizeRecord, Proposal, SlashRecord};
use crate::types::{BlockPayload, EventArgs, EventKind, RawEvent};

/// Mutating view over a [`BlockIndex`]. No I/O; every call is idempotent.
pub struct EventCorrelator<'a> {
    index: &'a mut BlockIndex,
}

impl<'a> EventCorrelator<'a> {
    pub fn new(index: &'a mut BlockIndex) -> Self {
        Self { index }
    }

    /// Dispatch on the event kind. `payload` is required for proposals.
    pub fn apply(
        &mut self,
        event: &RawEvent,
        payload: Option<&BlockPayload>,
    ) -> Result<bool, IndexError> {
        match (event.kind(), payload) {
            (EventKind::Proposal, Some(payload)) => self.apply_proposal(event, payload),
            (EventKind::Proposal, None) => Err(IndexError::UnexpectedEvent {
                expected: "proposal with block payload".into(),
                actual: "proposal without payload".into(),
            }),
            (EventKind::Finalize, _) => self.apply_finalize(event),
            (EventKind::Slash, _) => self.apply_slash(event),
        }
    }

    /// Index a proposal. Returns `true` if it was new.
    ///
    /// Held finalize/slash records for the same hash are applied now.
    pub fn apply_proposal(
        &mut self,
        event: &RawEvent,
        payload: &BlockPayload,
    ) -> Result<bool, IndexError> {
        let EventArgs::Proposal {
            proposal_number,
            block_hash,
        } = event.args
        else {
            return Err(unexpected(EventKind::Proposal, event));
        };

        let proposal = Proposal {
            block_hash,
            proposal_number,
            proposed_at_l1_height: event.l1_height,
            proposal_tx_hash: event.tx_hash,
            parent_block_hash: payload.parent_block_hash,
            proposer: payload.proposer,
            finalized: self.index.finalize_record(&block_hash).is_some(),
            slashed: self.index.slash_record(&block_hash).is_some(),
        };
        let inserted = self.index.upsert_proposal(proposal);
        if inserted {
            tracing::trace!(
                %block_hash,
                proposal_number,
                l1_height = event.l1_height,
                "Indexed proposal"
            );
        }
        Ok(inserted)
    }

    /// Record a finalization. Returns `true` if the proposal is already known.
    pub fn apply_finalize(&mut self, event: &RawEvent) -> Result<bool, IndexError> {
        let EventArgs::Finalize { block_hash } = event.args else {
            return Err(unexpected(EventKind::Finalize, event));
        };

        self.index.record_finalize(FinalizeRecord {
            block_hash,
            finalize_tx_hash: event.tx_hash,
            finalized_at_l1_height: event.l1_height,
        });
        let matched = self.index.mark_finalized(&block_hash);
        if !matched {
            tracing::trace!(%block_hash, "Holding finalization for unknown proposal");
        }
        Ok(matched)
    }

    /// Record a slash. Returns `true` if the proposal is already known.
    pub fn apply_slash(&mut self, event: &RawEvent) -> Result<bool, IndexError> {
        let EventArgs::Slash {
            block_hash,
            proposer,
            ref reason,
        } = event.args
        else {
            return Err(unexpected(EventKind::Slash, event));
        };

        self.index.record_slash(SlashRecord {
            block_hash,
            slash_tx_hash: event.tx_hash,
            slashed_at_l1_height: event.l1_height,
            proposer_address: proposer,
            reason: reason.clone(),
        });
        let matched = self.index.mark_slashed(&block_hash);
        if !matched {
            tracing::trace!(%block_hash, "Holding slash for unknown proposal");
        }
        Ok(matched)
    }
}

fn unexpected(expected: EventKind, event: &RawEvent) -> IndexError {
    IndexError::UnexpectedEvent {
        expected: expected.to_string(),
        actual: event.kind().to_string(),
    }
}
