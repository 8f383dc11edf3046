//! The in-memory block index.
//!
//! Holds proposals keyed by L2 block hash, finalize/slash records (which may
//! arrive before the proposal they refer to), the latest/oldest proposal
//! trackers and the parent → children adjacency map.
//!
//! Every mutation is idempotent: re-applying the same record leaves the index
//! unchanged. `finalized` and `slashed` only ever go from `false` to `true`.

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::types::Hash;

// ─── Records ─────────────────────────────────────────────────────────────────

/// One proposed L2 block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub block_hash: Hash,
    /// L2 height. Competing proposals may share it.
    pub proposal_number: u64,
    pub proposed_at_l1_height: u64,
    pub proposal_tx_hash: Hash,
    pub parent_block_hash: Hash,
    pub proposer: Address,
    pub finalized: bool,
    pub slashed: bool,
}

/// A `Finalize` event, kept whether or not its proposal is known yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeRecord {
    pub block_hash: Hash,
    pub finalize_tx_hash: Hash,
    pub finalized_at_l1_height: u64,
}

/// A `Slash` event, kept whether or not its proposal is known yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashRecord {
    pub block_hash: Hash,
    pub slash_tx_hash: Hash,
    pub slashed_at_l1_height: u64,
    pub proposer_address: Address,
    pub reason: String,
}

/// All proposals seen at one extreme proposal number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSet {
    pub number: u64,
    pub hashes: BTreeSet<Hash>,
}

impl ProposalSet {
    fn single(number: u64, hash: Hash) -> Self {
        Self {
            number,
            hashes: BTreeSet::from([hash]),
        }
    }
}

/// Counts over the index, for logging and reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub proposals: usize,
    pub finalized: usize,
    pub slashed: usize,
    /// Finalize records whose proposal has not been seen.
    pub pending_finalizations: usize,
    /// Slash records whose proposal has not been seen.
    pub pending_slashes: usize,
}

// ─── BlockIndex ──────────────────────────────────────────────────────────────

/// Hash-keyed proposal store with derived aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIndex {
    proposals: HashMap<Hash, Proposal>,
    finalizations: HashMap<Hash, FinalizeRecord>,
    slashes: HashMap<Hash, SlashRecord>,
    latest: Option<ProposalSet>,
    oldest: Option<ProposalSet>,
    children: HashMap<Hash, BTreeSet<Hash>>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a proposal by block hash.
    pub fn get(&self, hash: &Hash) -> Option<&Proposal> {
        self.proposals.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.proposals.contains_key(hash)
    }

    /// Number of proposals.
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Iterate over all proposals (unordered).
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// All proposals at a given L2 height.
    pub fn proposals_at(&self, number: u64) -> Vec<&Proposal> {
        self.proposals
            .values()
            .filter(|p| p.proposal_number == number)
            .collect()
    }

    /// Proposals at the highest proposal number seen, or `None` when empty.
    pub fn latest_proposal(&self) -> Option<&ProposalSet> {
        self.latest.as_ref()
    }

    /// Proposals at the lowest proposal number seen, or `None` when empty.
    pub fn oldest_proposal(&self) -> Option<&ProposalSet> {
        self.oldest.as_ref()
    }

    /// Known children of `parent`.
    pub fn children_of(&self, parent: &Hash) -> Option<&BTreeSet<Hash>> {
        self.children.get(parent)
    }

    pub fn finalize_record(&self, hash: &Hash) -> Option<&FinalizeRecord> {
        self.finalizations.get(hash)
    }

    pub fn slash_record(&self, hash: &Hash) -> Option<&SlashRecord> {
        self.slashes.get(hash)
    }

    /// Insert a proposal, or merge into the existing one.
    ///
    /// Immutable fields of an existing record are left untouched; only the
    /// `finalized`/`slashed` flags can be raised. Adjacency and the
    /// latest/oldest trackers are updated from the stored record.
    ///
    /// Returns `true` if the proposal was not indexed before.
    pub fn upsert_proposal(&mut self, proposal: Proposal) -> bool {
        let hash = proposal.block_hash;
        let (inserted, number, parent) = match self.proposals.get_mut(&hash) {
            Some(existing) => {
                existing.finalized |= proposal.finalized;
                existing.slashed |= proposal.slashed;
                (false, existing.proposal_number, existing.parent_block_hash)
            }
            None => {
                let number = proposal.proposal_number;
                let parent = proposal.parent_block_hash;
                self.proposals.insert(hash, proposal);
                (true, number, parent)
            }
        };

        self.children.entry(parent).or_default().insert(hash);
        self.track_latest(number, hash);
        self.track_oldest(number, hash);
        inserted
    }

    /// Set `finalized` on a known proposal. Returns `false` if it is unknown.
    pub fn mark_finalized(&mut self, hash: &Hash) -> bool {
        match self.proposals.get_mut(hash) {
            Some(p) => {
                p.finalized = true;
                true
            }
            None => false,
        }
    }

    /// Set `slashed` on a known proposal. Returns `false` if it is unknown.
    pub fn mark_slashed(&mut self, hash: &Hash) -> bool {
        match self.proposals.get_mut(hash) {
            Some(p) => {
                p.slashed = true;
                true
            }
            None => false,
        }
    }

    /// Keep a finalize record. The first record for a hash wins.
    pub fn record_finalize(&mut self, record: FinalizeRecord) {
        self.finalizations.entry(record.block_hash).or_insert(record);
    }

    /// Keep a slash record. The first record for a hash wins.
    pub fn record_slash(&mut self, record: SlashRecord) {
        self.slashes.entry(record.block_hash).or_insert(record);
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            proposals: self.proposals.len(),
            finalized: self.proposals.values().filter(|p| p.finalized).count(),
            slashed: self.proposals.values().filter(|p| p.slashed).count(),
            pending_finalizations: self
                .finalizations
                .keys()
                .filter(|h| !self.proposals.contains_key(*h))
                .count(),
            pending_slashes: self
                .slashes
                .keys()
                .filter(|h| !self.proposals.contains_key(*h))
                .count(),
        }
    }

    fn track_latest(&mut self, number: u64, hash: Hash) {
        let replace = match &mut self.latest {
            Some(set) if number == set.number => {
                set.hashes.insert(hash);
                false
            }
            Some(set) => number > set.number,
            None => true,
        };
        if replace {
            self.latest = Some(ProposalSet::single(number, hash));
        }
    }

    fn track_oldest(&mut self, number: u64, hash: Hash) {
        let replace = match &mut self.oldest {
            Some(set) if number == set.number => {
                set.hashes.insert(hash);
                false
            }
            Some(set) => number < set.number,
            None => true,
        };
        if replace {
            self.oldest = Some(ProposalSet::single(number, hash));
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn h(byte: u8) -> Hash {
        B256::repeat_byte(byte)
    }

    fn proposal(hash: Hash, number: u64, parent: Hash) -> Proposal {
        Proposal {
            block_hash: hash,
            proposal_number: number,
            proposed_at_l1_height: number * 10,
            proposal_tx_hash: h(0xee),
            parent_block_hash: parent,
            proposer: Address::ZERO,
            finalized: false,
            slashed: false,
        }
    }

    #[test]
    fn aggregate_extremes_track_ties() {
        let mut index = BlockIndex::new();
        let (a, b, c, d, e) = (h(0xa), h(0xb), h(0xc), h(0xd), h(0xe));
        for (hash, number) in [(a, 5), (b, 5), (c, 7), (d, 3), (e, 7)] {
            index.upsert_proposal(proposal(hash, number, h(0)));
        }

        let latest = index.latest_proposal().unwrap();
        assert_eq!(latest.number, 7);
        assert_eq!(latest.hashes, BTreeSet::from([c, e]));

        let oldest = index.oldest_proposal().unwrap();
        assert_eq!(oldest.number, 3);
        assert_eq!(oldest.hashes, BTreeSet::from([d]));
    }

    #[test]
    fn empty_index_has_no_extremes() {
        let index = BlockIndex::new();
        assert!(index.latest_proposal().is_none());
        assert!(index.oldest_proposal().is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn adjacency_is_a_set() {
        let mut index = BlockIndex::new();
        let (p, x, y) = (h(0x1), h(0x2), h(0x3));
        assert!(index.upsert_proposal(proposal(x, 2, p)));
        assert!(index.upsert_proposal(proposal(y, 2, p)));
        assert!(!index.upsert_proposal(proposal(x, 2, p)));

        assert_eq!(index.children_of(&p), Some(&BTreeSet::from([x, y])));
        assert_eq!(index.len(), 2);
        assert_eq!(index.latest_proposal().unwrap().hashes.len(), 2);
    }

    #[test]
    fn upsert_keeps_immutable_fields_and_raises_flags() {
        let mut index = BlockIndex::new();
        let hash = h(0x5);
        index.upsert_proposal(proposal(hash, 4, h(0x1)));

        let mut again = proposal(hash, 9, h(0x9));
        again.finalized = true;
        index.upsert_proposal(again);

        let stored = index.get(&hash).unwrap();
        assert_eq!(stored.proposal_number, 4);
        assert_eq!(stored.parent_block_hash, h(0x1));
        assert!(stored.finalized);
        assert_eq!(index.latest_proposal().unwrap().number, 4);
        assert!(index.children_of(&h(0x9)).is_none());
    }

    #[test]
    fn flags_never_revert() {
        let mut index = BlockIndex::new();
        let hash = h(0x7);
        index.upsert_proposal(proposal(hash, 1, h(0)));
        assert!(index.mark_finalized(&hash));
        assert!(index.mark_slashed(&hash));

        index.upsert_proposal(proposal(hash, 1, h(0)));
        let stored = index.get(&hash).unwrap();
        assert!(stored.finalized && stored.slashed);
        assert!(!index.mark_finalized(&h(0x8)));
    }

    #[test]
    fn summary_counts_pending_records() {
        let mut index = BlockIndex::new();
        index.upsert_proposal(proposal(h(0x1), 1, h(0)));
        index.mark_finalized(&h(0x1));
        index.record_finalize(FinalizeRecord {
            block_hash: h(0x1),
            finalize_tx_hash: h(0xf1),
            finalized_at_l1_height: 50,
        });
        index.record_finalize(FinalizeRecord {
            block_hash: h(0x2),
            finalize_tx_hash: h(0xf2),
            finalized_at_l1_height: 60,
        });

        let summary = index.summary();
        assert_eq!(summary.proposals, 1);
        assert_eq!(summary.finalized, 1);
        assert_eq!(summary.pending_finalizations, 1);
        assert_eq!(summary.pending_slashes, 0);
    }
}
