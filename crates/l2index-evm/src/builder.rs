//! Fluent builder API for creating coordinator indexers.
//!
//! # Example
//!
//! ```rust,no_run
//! use l2index_evm::IndexerBuilder;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut orchestrator = IndexerBuilder::new()
//!     .contract("0x48458C823DF628f0C053B0786d4111529B9fB7B0".parse()?)
//!     .span(5_000)
//!     .from_block(5_900_000)
//!     .connect_http("https://goerli.example/rpc")?;
//!
//! orchestrator.init(None).await?;
//! orchestrator.update_all(None).await?;
//! # Ok(())
//! # }
//! ```

use alloy_primitives::Address;
use tokio_util::sync::CancellationToken;

use l2index_core::{IndexerConfig, Orchestrator};

use crate::codec::CoordinatorPayloadDecoder;
use crate::error::TransportError;
use crate::fetcher::EvmDataSource;
use crate::http::{HttpClientConfig, HttpRpcClient};
use crate::transport::RpcTransport;

/// Fluent builder for [`IndexerConfig`] and coordinator orchestrators.
#[derive(Debug, Default)]
pub struct IndexerBuilder {
    config: IndexerConfig,
    http: HttpClientConfig,
    cancel: Option<CancellationToken>,
}

impl IndexerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coordinator contract address.
    pub fn contract(mut self, address: Address) -> Self {
        self.config.contract = address;
        self
    }

    /// Set the maximum number of blocks per `eth_getLogs` call.
    pub fn span(mut self, span: u64) -> Self {
        self.config.span = span;
        self
    }

    /// Lowest L1 height to scan.
    pub fn from_block(mut self, block: u64) -> Self {
        self.config.range.from = Some(block);
        self
    }

    /// Highest L1 height to scan (clamped to the chain head during `init`).
    pub fn to_block(mut self, block: u64) -> Self {
        self.config.range.to = Some(block);
        self
    }

    /// Proposal number that ends a backward proposal scan.
    pub fn genesis_proposal_number(mut self, number: u64) -> Self {
        self.config.genesis_proposal_number = number;
        self
    }

    /// HTTP client settings used by [`connect_http`](Self::connect_http).
    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http = config;
        self
    }

    /// Token observed by every pass of the built orchestrator.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the `IndexerConfig`.
    pub fn build_config(self) -> IndexerConfig {
        self.config
    }

    /// Build an orchestrator over an existing transport.
    pub fn build<T: RpcTransport>(self, transport: T) -> Orchestrator<EvmDataSource<T>> {
        let orchestrator = Orchestrator::new(
            self.config,
            EvmDataSource::new(transport),
            CoordinatorPayloadDecoder,
        );
        match self.cancel {
            Some(token) => orchestrator.with_cancellation(token),
            None => orchestrator,
        }
    }

    /// Build an orchestrator talking to `url` over HTTP.
    pub fn connect_http(
        self,
        url: impl Into<String>,
    ) -> Result<Orchestrator<EvmDataSource<HttpRpcClient>>, TransportError> {
        let client = HttpRpcClient::new(url, self.http.clone())?;
        tracing::debug!(url = client.url(), "Connected HTTP transport");
        Ok(self.build(client))
    }
}
