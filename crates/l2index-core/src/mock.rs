//! In-memory chain data source for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::error::IndexError;
use crate::source::{ChainDataSource, PayloadDecoder};
use crate::types::{
    BlockPayload, ContractConfig, EventArgs, EventFilter, EventKind, Hash, RawEvent, RawTx,
};

pub(crate) fn h(byte: u8) -> Hash {
    B256::repeat_byte(byte)
}

pub(crate) fn proposer() -> Address {
    Address::repeat_byte(0x42)
}

/// Serves a fixed set of events and records every query it receives.
pub(crate) struct MockSource {
    height: u64,
    config: Option<ContractConfig>,
    events: Vec<RawEvent>,
    txs: HashMap<Hash, RawTx>,
    queries: Mutex<Vec<(EventKind, u64, u64)>>,
    failures_left: Mutex<usize>,
    next_tx: u64,
}

impl MockSource {
    pub(crate) fn new(height: u64) -> Self {
        Self {
            height,
            config: Some(ContractConfig {
                address: Address::ZERO,
                chain_id: 5,
                code_hash: h(0xcc),
                code_size: 24_576,
            }),
            events: Vec::new(),
            txs: HashMap::new(),
            queries: Mutex::new(Vec::new()),
            failures_left: Mutex::new(0),
            next_tx: 1,
        }
    }

    pub(crate) fn without_config(mut self) -> Self {
        self.config = None;
        self
    }

    pub(crate) fn with_empty_contract(mut self) -> Self {
        if let Some(config) = self.config.as_mut() {
            config.code_size = 0;
        }
        self
    }

    /// Fail the next `n` log queries with `SourceUnavailable`.
    pub(crate) fn failing_queries(self, n: usize) -> Self {
        *self.failures_left.lock().unwrap() = n;
        self
    }

    fn tx_hash(&mut self) -> Hash {
        let hash = B256::from(U256::from(self.next_tx));
        self.next_tx += 1;
        hash
    }

    /// A proposal of block `h(hash)` whose parent is `h(parent)`.
    pub(crate) fn with_proposal(
        mut self,
        l1_height: u64,
        number: u64,
        hash: u8,
        parent: u8,
    ) -> Self {
        let tx_hash = self.tx_hash();
        let mut input = proposer().to_vec();
        input.extend_from_slice(h(parent).as_slice());
        self.txs.insert(
            tx_hash,
            RawTx {
                hash: tx_hash,
                block_number: Some(l1_height),
                from: proposer(),
                to: Some(Address::ZERO),
                input: Bytes::from(input),
            },
        );
        self.events.push(RawEvent {
            l1_height,
            tx_hash,
            log_index: 0,
            args: EventArgs::Proposal {
                proposal_number: number,
                block_hash: h(hash),
            },
        });
        self
    }

    /// A proposal whose transaction the node does not know.
    pub(crate) fn with_orphan_proposal(mut self, l1_height: u64, number: u64, hash: u8) -> Self {
        let tx_hash = self.tx_hash();
        self.events.push(RawEvent {
            l1_height,
            tx_hash,
            log_index: 0,
            args: EventArgs::Proposal {
                proposal_number: number,
                block_hash: h(hash),
            },
        });
        self
    }

    pub(crate) fn with_finalize(mut self, l1_height: u64, hash: u8) -> Self {
        let tx_hash = self.tx_hash();
        self.events.push(RawEvent {
            l1_height,
            tx_hash,
            log_index: 1,
            args: EventArgs::Finalize { block_hash: h(hash) },
        });
        self
    }

    pub(crate) fn with_slash(mut self, l1_height: u64, hash: u8, reason: &str) -> Self {
        let tx_hash = self.tx_hash();
        self.events.push(RawEvent {
            l1_height,
            tx_hash,
            log_index: 2,
            args: EventArgs::Slash {
                block_hash: h(hash),
                proposer: proposer(),
                reason: reason.into(),
            },
        });
        self
    }

    /// Windows queried for `kind`, in order.
    pub(crate) fn queries_for(&self, kind: EventKind) -> Vec<(u64, u64)> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, from, to)| (*from, *to))
            .collect()
    }
}

#[async_trait]
impl ChainDataSource for MockSource {
    async fn current_height(&self) -> Result<u64, IndexError> {
        Ok(self.height)
    }

    async fn contract_config(
        &self,
        _address: Address,
    ) -> Result<Option<ContractConfig>, IndexError> {
        Ok(self.config.clone())
    }

    async fn query_events(
        &self,
        filter: &EventFilter,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawEvent>, IndexError> {
        assert!(from <= to, "inverted query [{from}, {to}]");
        {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(IndexError::source("connection reset"));
            }
        }
        self.queries.lock().unwrap().push((filter.kind, from, to));

        let mut events: Vec<_> = self
            .events
            .iter()
            .filter(|ev| ev.kind() == filter.kind && (from..=to).contains(&ev.l1_height))
            .cloned()
            .collect();
        // Oldest first, like eth_getLogs.
        events.sort_by_key(|ev| (ev.l1_height, ev.log_index));
        Ok(events)
    }

    async fn transaction_by_hash(&self, hash: Hash) -> Result<RawTx, IndexError> {
        self.txs.get(&hash).cloned().ok_or(IndexError::NotFound {
            tx_hash: hash.to_string(),
        })
    }
}

/// Reads `proposer (20 bytes) ++ parent hash (32 bytes)` from the calldata.
pub(crate) struct MockDecoder;

impl PayloadDecoder for MockDecoder {
    fn decode_payload(&self, tx: &RawTx) -> Result<BlockPayload, IndexError> {
        if tx.input.len() < 52 {
            return Err(IndexError::source("short block payload"));
        }
        Ok(BlockPayload {
            proposer: Address::from_slice(&tx.input[..20]),
            parent_block_hash: B256::from_slice(&tx.input[20..52]),
        })
    }
}
