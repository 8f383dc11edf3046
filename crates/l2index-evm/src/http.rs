//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! - token bucket rate limiting, with `eth_getLogs` priced separately
//! - exponential backoff for transient failures (HTTP, timeout)
//! - node-side errors are returned immediately

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::policy::{RateLimiter, RateLimiterConfig, RetryConfig, RetryPolicy};
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::{RequestIds, RpcTransport};

/// Configuration for [`HttpRpcClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    pub rate_limiter: RateLimiterConfig,
    pub request_timeout: Duration,
    /// Longest rate-limit wait accepted before failing with `RateLimited`.
    pub max_rate_limit_wait: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            rate_limiter: RateLimiterConfig::default(),
            request_timeout: Duration::from_secs(30),
            max_rate_limit_wait: Duration::from_secs(30),
        }
    }
}

/// HTTP JSON-RPC client for one endpoint.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    rate_limiter: RateLimiter,
    request_timeout: Duration,
    max_rate_limit_wait: Duration,
    ids: RequestIds,
}

impl HttpRpcClient {
    /// Create a client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            rate_limiter: RateLimiter::new(config.rate_limiter),
            request_timeout: config.request_timeout,
            max_rate_limit_wait: config.max_rate_limit_wait,
            ids: RequestIds::default(),
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    async fn throttle(&self, method: &str) -> Result<(), TransportError> {
        let cost = self.rate_limiter.cost_of(method);
        while let Err(wait) = self.rate_limiter.try_acquire(cost) {
            if wait > self.max_rate_limit_wait {
                return Err(TransportError::RateLimited {
                    provider: self.url.clone(),
                });
            }
            tracing::debug!(
                method,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, backing off"
            );
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        ms: self.request_timeout.as_millis() as u64,
                    }
                } else {
                    TransportError::Http(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.throttle(&req.method).await?;

        let mut attempt = 0u32;
        loop {
            match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    match self.retry.next_delay(attempt) {
                        Some(delay) => {
                            tracing::warn!(
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                method = %req.method,
                                error = %e,
                                url = %self.url,
                                "Retrying request"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            tracing::error!(
                                attempt,
                                method = %req.method,
                                error = %e,
                                url = %self.url,
                                "Max retries exceeded"
                            );
                            return Err(e);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.ids.next()
    }
}
