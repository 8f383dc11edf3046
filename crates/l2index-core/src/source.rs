//! The chain data source capability consumed by the engine.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::error::IndexError;
use crate::types::{BlockPayload, ContractConfig, EventFilter, Hash, RawEvent, RawTx};

/// Everything the engine needs from an L1 node.
///
/// Every method is a suspension point; nothing else in the engine blocks.
/// Implementations own timeouts. Failures surface as
/// [`IndexError::SourceUnavailable`] unless stated otherwise.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Current L1 chain height.
    async fn current_height(&self) -> Result<u64, IndexError>;

    /// Configuration of the contract at `address`, or `None` if there is none.
    async fn contract_config(&self, address: Address)
        -> Result<Option<ContractConfig>, IndexError>;

    /// Logs matching `filter` in the inclusive range `[from, to]`.
    ///
    /// Callers guarantee `from <= to` and that the range respects the
    /// provider's span limit.
    async fn query_events(
        &self,
        filter: &EventFilter,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawEvent>, IndexError>;

    /// Look up a transaction. Fails with [`IndexError::NotFound`] if the node
    /// does not know it.
    async fn transaction_by_hash(&self, hash: Hash) -> Result<RawTx, IndexError>;
}

#[async_trait]
impl<T: ChainDataSource + ?Sized> ChainDataSource for std::sync::Arc<T> {
    async fn current_height(&self) -> Result<u64, IndexError> {
        (**self).current_height().await
    }

    async fn contract_config(
        &self,
        address: Address,
    ) -> Result<Option<ContractConfig>, IndexError> {
        (**self).contract_config(address).await
    }

    async fn query_events(
        &self,
        filter: &EventFilter,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawEvent>, IndexError> {
        (**self).query_events(filter, from, to).await
    }

    async fn transaction_by_hash(&self, hash: Hash) -> Result<RawTx, IndexError> {
        (**self).transaction_by_hash(hash).await
    }
}

/// Recovers block header fields from the calldata of a proposal transaction.
///
/// The payload layout is rollup-specific, so the chain adapter supplies it.
pub trait PayloadDecoder: Send + Sync {
    fn decode_payload(&self, tx: &RawTx) -> Result<BlockPayload, IndexError>;
}
