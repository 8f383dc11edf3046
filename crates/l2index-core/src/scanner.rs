//! Backward, span-limited log pagination.
//!
//! Providers silently cap the block range of a single `eth_getLogs` call, so a
//! logical query over `[lower, upper]` is split into windows of at most
//! `span + 2` blocks, walked from `upper` down to `lower`:
//!
//! ```text
//! current = upper
//! loop:
//!     query [max(current - span - 1, lower), current]
//!     stop if the window reached `lower` or the stop predicate matched
//!     current -= span
//! ```
//!
//! Consecutive windows share their two boundary blocks, so an event emitted in
//! one of them is returned twice. Consumers are idempotent.

use tokio_util::sync::CancellationToken;

use crate::error::IndexError;
use crate::source::ChainDataSource;
use crate::types::{EventFilter, RawEvent, ScanRange};

/// Predicate evaluated on every event; `true` ends the scan after the batch.
pub type StopPredicate = dyn Fn(&RawEvent) -> bool + Send + Sync;

/// Splits log queries into span-limited windows.
#[derive(Debug, Clone, Copy)]
pub struct RangeScanner {
    span: u64,
}

impl RangeScanner {
    /// Create a scanner. A span of 0 is treated as 1.
    pub fn new(span: u64) -> Self {
        Self { span: span.max(1) }
    }

    pub fn span(&self) -> u64 {
        self.span
    }

    /// Start a batch-at-a-time walk over `range`.
    pub fn walk<'a, D>(
        &self,
        source: &'a D,
        filter: EventFilter,
        range: ScanRange,
    ) -> ScanWalk<'a, D>
    where
        D: ChainDataSource + ?Sized,
    {
        ScanWalk {
            source,
            filter,
            range,
            span: self.span,
            current: Some(range.upper_bound),
            stop: None,
            cancel: CancellationToken::new(),
            queries: 0,
            stopped_early: false,
        }
    }

    /// Run a whole walk and collect every event, in batch order.
    pub async fn scan<D, F>(
        &self,
        source: &D,
        filter: EventFilter,
        range: ScanRange,
        stop: Option<F>,
    ) -> Result<Vec<RawEvent>, IndexError>
    where
        D: ChainDataSource + ?Sized,
        F: Fn(&RawEvent) -> bool + Send + Sync + 'static,
    {
        let mut walk = self.walk(source, filter, range);
        if let Some(stop) = stop {
            walk = walk.with_stop(stop);
        }
        let mut events = Vec::new();
        while let Some(batch) = walk.next_batch().await? {
            events.extend(batch.events);
        }
        Ok(events)
    }
}

/// One window's worth of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub from: u64,
    pub to: u64,
    /// Events in the order the source returned them.
    pub events: Vec<RawEvent>,
}

/// An in-progress backward walk. Each [`ScanWalk::next_batch`] issues exactly
/// one query.
pub struct ScanWalk<'a, D: ?Sized> {
    source: &'a D,
    filter: EventFilter,
    range: ScanRange,
    span: u64,
    /// Upper end of the next window; `None` once the walk is finished.
    current: Option<u64>,
    stop: Option<Box<StopPredicate>>,
    cancel: CancellationToken,
    queries: usize,
    stopped_early: bool,
}

impl<'a, D> ScanWalk<'a, D>
where
    D: ChainDataSource + ?Sized,
{
    /// End the walk after the first batch containing a matching event.
    pub fn with_stop(mut self, stop: impl Fn(&RawEvent) -> bool + Send + Sync + 'static) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }

    /// Abort with [`IndexError::Cancelled`] at the next batch boundary once
    /// `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fetch the next window. Returns `Ok(None)` when the walk is finished.
    ///
    /// A failed query leaves the walk where it was, so calling again retries
    /// the same window.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>, IndexError> {
        let Some(current) = self.current else {
            return Ok(None);
        };
        if self.cancel.is_cancelled() {
            self.current = None;
            return Err(IndexError::Cancelled);
        }

        let lower = self.range.lower_bound;
        let from = current.saturating_sub(self.span.saturating_add(1)).max(lower);
        let events = self.source.query_events(&self.filter, from, current).await?;
        self.queries += 1;

        tracing::debug!(
            kind = %self.filter.kind,
            from,
            to = current,
            events = events.len(),
            "Fetched log window"
        );

        let hit = self
            .stop
            .as_ref()
            .is_some_and(|stop| events.iter().any(|ev| stop(ev)));

        self.current = if hit || from <= lower {
            None
        } else {
            Some(current - self.span)
        };
        if hit {
            self.stopped_early = true;
            tracing::info!(
                kind = %self.filter.kind,
                at = from,
                "Stop condition reached, ending scan"
            );
        }

        Ok(Some(Batch {
            from,
            to: current,
            events,
        }))
    }

    /// `true` once no more queries will be issued.
    pub fn is_done(&self) -> bool {
        self.current.is_none()
    }

    /// Number of successful queries so far.
    pub fn queries(&self) -> usize {
        self.queries
    }

    /// `true` if the stop predicate ended the walk before `lower_bound`.
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
