//! Interfaces to a local forked development chain.
//!
//! The engine itself never needs these; they let tests and tooling pin a
//! forked L1 at a known height and control block production while the
//! orchestrator scans it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// How a forked chain to start should be configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkConfig {
    /// Upstream JSON-RPC endpoint to fork from.
    pub rpc_url: String,
    /// Fork at this L1 height; `None` = upstream head.
    pub block_number: Option<u64>,
    /// Chain id reported by the fork.
    pub chain_id: Option<u64>,
}

impl ForkConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            block_number: None,
            chain_id: None,
        }
    }

    pub fn at_block(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Environment variables understood by the forked-node image.
    pub fn env(&self) -> Vec<String> {
        let mut env = vec![format!("URL={}", self.rpc_url)];
        if let Some(n) = self.block_number {
            env.push(format!("BLOCK_NUMBER={n}"));
        }
        if let Some(id) = self.chain_id {
            env.push(format!("CHAINID={id}"));
        }
        env
    }
}

/// Starts and stops forked chain processes (containers, child processes, ...).
#[async_trait]
pub trait ChainRuntime: Send + Sync {
    type Handle: Send + Sync;

    async fn start(&self, config: &ForkConfig) -> Result<Self::Handle, IndexError>;

    async fn stop(&self, handle: Self::Handle) -> Result<(), IndexError>;
}

/// Block production mode of a development chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MiningMode {
    /// No block production configured, or the last control call failed.
    #[default]
    Stopped,
    /// Blocks are mined only on `advance()`.
    Manual,
    /// One block per transaction.
    Instant,
    /// One block every interval.
    Interval(Duration),
}

impl std::fmt::Display for MiningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Manual => write!(f, "manual"),
            Self::Instant => write!(f, "instant"),
            Self::Interval(d) => write!(f, "interval({}ms)", d.as_millis()),
        }
    }
}

/// Controls block production of a development chain.
#[async_trait]
pub trait MiningControl: Send + Sync {
    /// Mine one block. Switches the mode to [`MiningMode::Manual`].
    async fn advance(&self) -> Result<(), IndexError>;

    /// Switch to `Instant` or `Interval` production (or `Manual`, which
    /// disables automatic mining).
    async fn set_mining_mode(&self, mode: MiningMode) -> Result<(), IndexError>;

    /// Re-fork the chain at `block_number`. Leaves mining `Stopped`.
    async fn reset_fork(&self, block_number: u64) -> Result<(), IndexError>;

    /// Current head of the development chain.
    async fn current_block(&self) -> Result<u64, IndexError>;

    /// Mode set by the last successful control call.
    fn mining_mode(&self) -> MiningMode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_config_env() {
        let cfg = ForkConfig::new("https://goerli.example").at_block(5_910_000).chain_id(5);
        assert_eq!(
            cfg.env(),
            vec![
                "URL=https://goerli.example".to_string(),
                "BLOCK_NUMBER=5910000".to_string(),
                "CHAINID=5".to_string(),
            ]
        );
        assert_eq!(ForkConfig::new("http://x").env().len(), 1);
    }

    #[test]
    fn mining_mode_display() {
        assert_eq!(MiningMode::default().to_string(), "stopped");
        assert_eq!(
            MiningMode::Interval(Duration::from_millis(1500)).to_string(),
            "interval(1500ms)"
        );
    }
}
