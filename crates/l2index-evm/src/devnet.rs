//! Block production control for Hardhat-compatible development nodes.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use l2index_core::devnet::{MiningControl, MiningMode};
use l2index_core::IndexError;

use crate::codec::parse_hex_u64;
use crate::error::TransportError;
use crate::transport::RpcTransport;

/// Drives a forked development chain through its JSON-RPC control methods
/// (`evm_mine`, `evm_setAutomine`, `evm_setIntervalMining`, `hardhat_reset`).
pub struct JsonRpcMiningController<T> {
    transport: T,
    /// Upstream endpoint passed to `hardhat_reset`.
    fork_url: String,
    mode: Mutex<MiningMode>,
}

impl<T: RpcTransport> JsonRpcMiningController<T> {
    pub fn new(transport: T, fork_url: impl Into<String>) -> Self {
        Self {
            transport,
            fork_url: fork_url.into(),
            mode: Mutex::new(MiningMode::Stopped),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn set_mode(&self, mode: MiningMode) {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = mode;
    }

    async fn control(&self, method: &str, params: Vec<Value>) -> Result<(), TransportError> {
        // Nodes answer control calls with `null`, `true` or a block number.
        let _: Value = self.transport.call(method, params).await?;
        Ok(())
    }

    async fn apply_mode(&self, mode: MiningMode) -> Result<(), TransportError> {
        match mode {
            MiningMode::Instant => self.control("evm_setAutomine", vec![json!(true)]).await,
            MiningMode::Interval(interval) => {
                let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
                self.control("evm_setIntervalMining", vec![json!(ms)]).await
            }
            MiningMode::Manual => {
                self.control("evm_setAutomine", vec![json!(false)]).await?;
                self.control("evm_setIntervalMining", vec![json!(0)]).await
            }
            MiningMode::Stopped => self.control("evm_setIntervalMining", vec![json!(0)]).await,
        }
    }
}

#[async_trait]
impl<T: RpcTransport> MiningControl for JsonRpcMiningController<T> {
    async fn advance(&self) -> Result<(), IndexError> {
        match self.control("evm_mine", vec![]).await {
            Ok(()) => {
                self.set_mode(MiningMode::Manual);
                Ok(())
            }
            Err(e) => {
                self.set_mode(MiningMode::Stopped);
                tracing::warn!(error = %e, "Failed to mine next block");
                Err(IndexError::source(format!("failed to mine next block: {e}")))
            }
        }
    }

    async fn set_mining_mode(&self, mode: MiningMode) -> Result<(), IndexError> {
        // Interval mining at 0ms is how nodes spell "stop interval mining".
        let mode = match mode {
            MiningMode::Interval(interval) if interval.as_millis() == 0 => MiningMode::Stopped,
            other => other,
        };
        match self.apply_mode(mode).await {
            Ok(()) => {
                tracing::info!(%mode, "Mining mode changed");
                self.set_mode(mode);
                Ok(())
            }
            Err(e) => {
                self.set_mode(MiningMode::Stopped);
                tracing::warn!(%mode, error = %e, "Failed to change mining mode");
                Err(IndexError::source(format!("failed to set {mode} mining: {e}")))
            }
        }
    }

    async fn reset_fork(&self, block_number: u64) -> Result<(), IndexError> {
        let params = json!({
            "forking": {
                "jsonRpcUrl": self.fork_url,
                "blockNumber": block_number,
            }
        });
        let result = self.control("hardhat_reset", vec![params]).await;
        self.set_mode(MiningMode::Stopped);
        result.map_err(|e| {
            IndexError::source(format!("failed to reset fork at {block_number}: {e}"))
        })?;

        tracing::info!(block_number, "Fork reset");
        Ok(())
    }

    async fn current_block(&self) -> Result<u64, IndexError> {
        let head: String = self.transport.call("eth_blockNumber", vec![]).await?;
        Ok(parse_hex_u64(&head)?)
    }

    fn mining_mode(&self) -> MiningMode {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::mock::{rpc_error, ScriptedTransport};

    fn node(healthy: Arc<AtomicBool>) -> ScriptedTransport {
        ScriptedTransport::new(move |req| {
            if !healthy.load(Ordering::SeqCst) {
                return Err(rpc_error(-32603, "node crashed"));
            }
            match req.method.as_str() {
                "eth_blockNumber" => Ok(json!("0x5a2e10")),
                "evm_mine" => Ok(json!("0x0")),
                _ => Ok(Value::Null),
            }
        })
    }

    #[tokio::test]
    async fn mode_follows_successful_calls() {
        let healthy = Arc::new(AtomicBool::new(true));
        let ctl = JsonRpcMiningController::new(node(healthy), "https://goerli.example");
        assert_eq!(ctl.mining_mode(), MiningMode::Stopped);

        ctl.advance().await.unwrap();
        assert_eq!(ctl.mining_mode(), MiningMode::Manual);

        ctl.set_mining_mode(MiningMode::Interval(Duration::from_secs(2))).await.unwrap();
        assert_eq!(ctl.mining_mode(), MiningMode::Interval(Duration::from_secs(2)));
        let sent = ctl.transport().requests("evm_setIntervalMining");
        assert_eq!(sent[0].params, vec![json!(2000)]);

        ctl.set_mining_mode(MiningMode::Instant).await.unwrap();
        assert_eq!(ctl.mining_mode(), MiningMode::Instant);
        assert_eq!(ctl.current_block().await.unwrap(), 5_910_032);
    }

    #[tokio::test]
    async fn failed_call_stops_mining() {
        let healthy = Arc::new(AtomicBool::new(true));
        let ctl = JsonRpcMiningController::new(node(healthy.clone()), "https://goerli.example");
        ctl.set_mining_mode(MiningMode::Instant).await.unwrap();

        healthy.store(false, Ordering::SeqCst);
        assert!(ctl.advance().await.is_err());
        assert_eq!(ctl.mining_mode(), MiningMode::Stopped);

        healthy.store(true, Ordering::SeqCst);
        ctl.set_mining_mode(MiningMode::Manual).await.unwrap();
        healthy.store(false, Ordering::SeqCst);
        assert!(ctl.set_mining_mode(MiningMode::Instant).await.is_err());
        assert_eq!(ctl.mining_mode(), MiningMode::Stopped);
    }

    #[tokio::test]
    async fn zero_interval_stops_mining() {
        let ctl = JsonRpcMiningController::new(
            node(Arc::new(AtomicBool::new(true))),
            "https://goerli.example",
        );
        ctl.set_mining_mode(MiningMode::Interval(Duration::from_secs(1))).await.unwrap();
        ctl.set_mining_mode(MiningMode::Interval(Duration::ZERO)).await.unwrap();
        ctl.set_mining_mode(MiningMode::Interval(Duration::from_micros(400))).await.unwrap();

        assert_eq!(ctl.mining_mode(), MiningMode::Stopped);
        let sent = ctl.transport().requests("evm_setIntervalMining");
        let intervals: Vec<_> = sent.iter().map(|r| r.params[0].clone()).collect();
        assert_eq!(intervals, vec![json!(1000), json!(0), json!(0)]);
    }

    #[tokio::test]
    async fn reset_fork_sends_forking_params() {
        let ctl = JsonRpcMiningController::new(
            node(Arc::new(AtomicBool::new(true))),
            "https://goerli.example",
        );
        ctl.advance().await.unwrap();
        ctl.reset_fork(5_910_000).await.unwrap();

        assert_eq!(ctl.mining_mode(), MiningMode::Stopped);
        let sent = ctl.transport().requests("hardhat_reset");
        assert_eq!(sent[0].params[0]["forking"]["blockNumber"], 5_910_000);
        assert_eq!(sent[0].params[0]["forking"]["jsonRpcUrl"], "https://goerli.example");
    }
}
