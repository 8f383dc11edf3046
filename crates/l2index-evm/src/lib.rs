//! l2index-evm: Ethereum JSON-RPC backend for l2index.
//!
//! Provides:
//! - `HttpRpcClient`: JSON-RPC over HTTP with rate limiting and retries
//! - `EvmDataSource`: `ChainDataSource` over any `RpcTransport`
//! - coordinator log and proposal calldata decoding
//! - `IndexerBuilder`: fluent construction of orchestrators
//! - `JsonRpcMiningController`: block production control for dev nodes

pub mod builder;
pub mod codec;
pub mod devnet;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod policy;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use builder::IndexerBuilder;
pub use codec::{decode_log, CoordinatorPayloadDecoder, RawLog};
pub use devnet::JsonRpcMiningController;
pub use error::TransportError;
pub use fetcher::EvmDataSource;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use transport::RpcTransport;
