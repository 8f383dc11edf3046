//! `ChainDataSource` over Ethereum JSON-RPC.
//!
//! | operation             | RPC                                    |
//! |-----------------------|----------------------------------------|
//! | `current_height`      | `eth_blockNumber`                      |
//! | `contract_config`     | `eth_getCode` + `eth_chainId`          |
//! | `query_events`        | `eth_getLogs` (address + topic0)       |
//! | `transaction_by_hash` | `eth_getTransactionByHash`             |

use alloy_primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use l2index_core::{
    ChainDataSource, ContractConfig, EventFilter, Hash, IndexError, RawEvent, RawTx,
};

use crate::codec::{decode_log, parse_hex_u64, to_hex_quantity, topic0, RawLog};
use crate::transport::RpcTransport;

/// A transaction as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: B256,
    block_number: Option<String>,
    from: Address,
    to: Option<Address>,
    input: Bytes,
}

/// Chain data source backed by any [`RpcTransport`].
pub struct EvmDataSource<T> {
    transport: T,
}

impl<T: RpcTransport> EvmDataSource<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Raw logs for `filter` in `[from, to]`, reorged-out logs dropped.
    pub async fn logs(
        &self,
        filter: &EventFilter,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, IndexError> {
        let params = json!({
            "address": filter.address,
            "topics": [topic0(filter.kind)],
            "fromBlock": to_hex_quantity(from),
            "toBlock": to_hex_quantity(to),
        });
        let logs: Vec<RawLog> = self.transport.call("eth_getLogs", vec![params]).await?;
        Ok(logs.into_iter().filter(|l| !l.is_removed()).collect())
    }
}

#[async_trait]
impl<T: RpcTransport> ChainDataSource for EvmDataSource<T> {
    async fn current_height(&self) -> Result<u64, IndexError> {
        let head: String = self.transport.call("eth_blockNumber", vec![]).await?;
        Ok(parse_hex_u64(&head)?)
    }

    async fn contract_config(
        &self,
        address: Address,
    ) -> Result<Option<ContractConfig>, IndexError> {
        let code: Bytes = self
            .transport
            .call("eth_getCode", vec![json!(address), json!("latest")])
            .await?;
        if code.is_empty() {
            return Ok(None);
        }
        let chain_id: String = self.transport.call("eth_chainId", vec![]).await?;

        Ok(Some(ContractConfig {
            address,
            chain_id: parse_hex_u64(&chain_id)?,
            code_hash: keccak256(&code),
            code_size: code.len(),
        }))
    }

    async fn query_events(
        &self,
        filter: &EventFilter,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawEvent>, IndexError> {
        let logs = self.logs(filter, from, to).await?;
        let mut events = logs
            .iter()
            .map(|log| decode_log(filter.kind, log))
            .collect::<Result<Vec<_>, _>>()?;
        events.sort_by_key(|e| (e.l1_height, e.log_index));

        tracing::debug!(
            kind = %filter.kind,
            from,
            to,
            count = events.len(),
            "Fetched coordinator logs"
        );
        Ok(events)
    }

    async fn transaction_by_hash(&self, hash: Hash) -> Result<RawTx, IndexError> {
        let tx: Option<RpcTransaction> = self
            .transport
            .call("eth_getTransactionByHash", vec![json!(hash)])
            .await?;
        let tx = tx.ok_or_else(|| IndexError::NotFound {
            tx_hash: hash.to_string(),
        })?;

        Ok(RawTx {
            hash: tx.hash,
            block_number: tx.block_number.as_deref().map(parse_hex_u64).transpose()?,
            from: tx.from,
            to: tx.to,
            input: tx.input,
        })
    }
}
