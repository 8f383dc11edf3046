//! The orchestrator. Resolves the search range and drives one backward pass
//! per event kind.
//!
//! # Lifecycle
//! `Uninitialized → init() → Ready → update_*() (Scanning) → Ready`
//!
//! # Passes
//! - proposals: walk back until the genesis proposal is seen; one transaction
//!   lookup per proposal event to recover the parent hash
//! - finalizations / slashes: walk the whole range
//!
//! Passes may run concurrently ([`Orchestrator::update_all`]). Each pass walks
//! its range strictly sequentially, and every index write goes through a single
//! `RwLock`. A failed pass keeps the batches it already applied; re-running it
//! is safe because every mutation is idempotent.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy_primitives::Address;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;

use crate::correlator::EventCorrelator;
use crate::error::IndexError;
use crate::index::{BlockIndex, IndexSummary, Proposal, ProposalSet};
use crate::indexer::{IndexerConfig, IndexerState};
use crate::scanner::RangeScanner;
use crate::source::{ChainDataSource, PayloadDecoder};
use crate::types::{
    BlockPayload, ContractConfig, EventFilter, EventKind, Hash, RangeOverride, RawEvent, ScanRange,
};

/// Outcome of one update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub kind: EventKind,
    /// Range actually walked.
    pub range: ScanRange,
    /// Log queries issued.
    pub queries: usize,
    /// Events received, including duplicates from overlapping windows.
    pub events: usize,
    /// New proposals, or finalize/slash events matched to a known proposal.
    pub matched: usize,
    /// `true` if the genesis proposal ended the walk.
    pub stopped_early: bool,
}

/// Reports of an [`Orchestrator::update_all`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub proposals: PassReport,
    pub finalizations: PassReport,
    pub slashes: PassReport,
}

/// Owns the scan session: configuration, data source and the block index.
pub struct Orchestrator<D> {
    config: IndexerConfig,
    source: D,
    decoder: Box<dyn PayloadDecoder>,
    scanner: RangeScanner,
    index: RwLock<BlockIndex>,
    range: Option<ScanRange>,
    contract: Option<ContractConfig>,
    active_passes: AtomicUsize,
    cancel: Mutex<CancellationToken>,
}

impl<D: ChainDataSource> Orchestrator<D> {
    pub fn new(config: IndexerConfig, source: D, decoder: impl PayloadDecoder + 'static) -> Self {
        Self {
            scanner: RangeScanner::new(config.span),
            config,
            source,
            decoder: Box::new(decoder),
            index: RwLock::new(BlockIndex::new()),
            range: None,
            contract: None,
            active_passes: AtomicUsize::new(0),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Use `token` to abort running passes at their next batch boundary.
    pub fn with_cancellation(self, token: CancellationToken) -> Self {
        *self.lock_cancel() = token;
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Token that cancels every pass of this orchestrator.
    ///
    /// Once cancelled, new passes fail with [`IndexError::Cancelled`] until
    /// [`reset_cancellation`](Self::reset_cancellation) installs a fresh token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.lock_cancel().clone()
    }

    /// Replace the current token with a fresh one and return it.
    ///
    /// Passes already running keep observing the token they started with.
    pub fn reset_cancellation(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        *self.lock_cancel() = fresh.clone();
        fresh
    }

    fn lock_cancel(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> IndexerState {
        if self.range.is_none() {
            IndexerState::Uninitialized
        } else if self.active_passes.load(Ordering::SeqCst) > 0 {
            IndexerState::Scanning
        } else {
            IndexerState::Ready
        }
    }

    /// Range resolved by `init`.
    pub fn range(&self) -> Option<ScanRange> {
        self.range
    }

    /// Contract configuration fetched by `init`.
    pub fn contract(&self) -> Option<&ContractConfig> {
        self.contract.as_ref()
    }

    /// Resolve the search range and verify the contract. Call exactly once.
    ///
    /// `lower = from ?? 0`, `upper = min(to ?? height, height)`. When `range`
    /// is `None` the configured range is used.
    pub async fn init(&mut self, range: Option<RangeOverride>) -> Result<ScanRange, IndexError> {
        if self.range.is_some() {
            return Err(IndexError::AlreadyInitialized);
        }
        let over = range.unwrap_or(self.config.range);

        let height = self.source.current_height().await?;
        let lower = over.from.unwrap_or(0);
        let upper = over.to.map_or(height, |to| to.min(height));
        let resolved = ScanRange::new(lower, upper)?;

        let address = self.config.contract;
        let contract = match self.source.contract_config(address).await {
            Ok(Some(config)) if !config.is_empty() => config,
            Ok(Some(_)) => return Err(invalid_contract(address, "no contract code at address")),
            Ok(None) => return Err(invalid_contract(address, "no configuration returned")),
            Err(e) => return Err(invalid_contract(address, e)),
        };

        tracing::info!(
            contract = %address,
            chain_id = contract.chain_id,
            head = height,
            from = resolved.lower_bound,
            to = resolved.upper_bound,
            span = self.scanner.span(),
            "Orchestrator initialized"
        );

        self.contract = Some(contract);
        self.range = Some(resolved);
        Ok(resolved)
    }

    /// Discover proposals, walking back until the genesis proposal.
    pub async fn update_proposals(
        &self,
        range: Option<RangeOverride>,
    ) -> Result<PassReport, IndexError> {
        self.run_pass(EventKind::Proposal, range).await
    }

    /// Discover finalizations over the whole range.
    pub async fn update_finalize(
        &self,
        range: Option<RangeOverride>,
    ) -> Result<PassReport, IndexError> {
        self.run_pass(EventKind::Finalize, range).await
    }

    /// Discover slashes over the whole range.
    pub async fn update_slash(
        &self,
        range: Option<RangeOverride>,
    ) -> Result<PassReport, IndexError> {
        self.run_pass(EventKind::Slash, range).await
    }

    /// Run all three passes concurrently. The first failure aborts the rest.
    pub async fn update_all(&self, range: Option<RangeOverride>) -> Result<SyncReport, IndexError> {
        let (proposals, finalizations, slashes) = tokio::try_join!(
            self.update_proposals(range),
            self.update_finalize(range),
            self.update_slash(range),
        )?;

        let summary = self.summary().await;
        tracing::info!(
            proposals = summary.proposals,
            finalized = summary.finalized,
            slashed = summary.slashed,
            pending_finalizations = summary.pending_finalizations,
            pending_slashes = summary.pending_slashes,
            "Sync complete"
        );
        Ok(SyncReport {
            proposals,
            finalizations,
            slashes,
        })
    }

    // ─── Read accessors ──────────────────────────────────────────────────────

    pub async fn proposal(&self, hash: &Hash) -> Option<Proposal> {
        self.index.read().await.get(hash).cloned()
    }

    pub async fn latest_proposal(&self) -> Option<ProposalSet> {
        self.index.read().await.latest_proposal().cloned()
    }

    pub async fn oldest_proposal(&self) -> Option<ProposalSet> {
        self.index.read().await.oldest_proposal().cloned()
    }

    /// Children of `parent`; empty when none are known.
    pub async fn children_of(&self, parent: &Hash) -> BTreeSet<Hash> {
        self.index
            .read()
            .await
            .children_of(parent)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn summary(&self) -> IndexSummary {
        self.index.read().await.summary()
    }

    /// Shared read access to the whole index. Blocks writers while held.
    pub async fn index(&self) -> RwLockReadGuard<'_, BlockIndex> {
        self.index.read().await
    }

    // ─── Pass driver ─────────────────────────────────────────────────────────

    async fn run_pass(
        &self,
        kind: EventKind,
        range: Option<RangeOverride>,
    ) -> Result<PassReport, IndexError> {
        let resolved = self.range.ok_or(IndexError::NotInitialized)?;
        let range = resolved.narrow(&range.unwrap_or_default())?;
        let _active = ActivePass::enter(&self.active_passes);

        let filter = EventFilter::new(self.config.contract, kind);
        let mut walk = self
            .scanner
            .walk(&self.source, filter, range)
            .with_cancellation(self.cancellation_token());
        if kind == EventKind::Proposal {
            let genesis = self.config.genesis_proposal_number;
            walk = walk.with_stop(move |ev| ev.proposal_number() == Some(genesis));
        }

        tracing::info!(
            %kind,
            from = range.lower_bound,
            to = range.upper_bound,
            "Starting pass"
        );

        let mut events = 0;
        let mut matched = 0;
        while let Some(batch) = walk.next_batch().await? {
            let payloads = match kind {
                EventKind::Proposal => self.resolve_payloads(&batch.events).await?,
                _ => vec![None; batch.events.len()],
            };

            let mut index = self.index.write().await;
            let mut correlator = EventCorrelator::new(&mut index);
            for (event, payload) in batch.events.iter().zip(&payloads) {
                if correlator.apply(event, payload.as_ref())? {
                    matched += 1;
                }
            }
            events += batch.events.len();
        }

        let report = PassReport {
            kind,
            range,
            queries: walk.queries(),
            events,
            matched,
            stopped_early: walk.stopped_early(),
        };
        tracing::info!(
            %kind,
            queries = report.queries,
            events = report.events,
            matched = report.matched,
            stopped_early = report.stopped_early,
            "Pass complete"
        );
        Ok(report)
    }

    /// One transaction lookup per proposal event, issued concurrently and
    /// outside the index lock.
    async fn resolve_payloads(
        &self,
        events: &[RawEvent],
    ) -> Result<Vec<Option<BlockPayload>>, IndexError> {
        let lookups = events.iter().map(|event| async move {
            let tx = self.source.transaction_by_hash(event.tx_hash).await?;
            self.decoder.decode_payload(&tx).map(Some)
        });
        try_join_all(lookups).await
    }
}

fn invalid_contract(address: Address, reason: impl std::fmt::Display) -> IndexError {
    IndexError::InvalidContract {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

/// Marks a pass as running for as long as it is alive.
struct ActivePass<'a>(&'a AtomicUsize);

impl<'a> ActivePass<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActivePass<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
