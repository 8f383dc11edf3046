//! Token bucket rate limiter.
//!
//! Tokens accrue at `refill_rate` per second up to `capacity`. Each request
//! consumes a cost; `eth_getLogs` is usually priced higher than plain reads.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum tokens in the bucket.
    pub capacity: f64,
    /// Token refill rate (tokens per second).
    pub refill_rate: f64,
    /// Cost of one `eth_getLogs` request.
    pub logs_cost: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 50.0,
            refill_rate: 25.0,
            logs_cost: 5.0,
        }
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Thread-safe token bucket.
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: config.capacity,
                last_refill: Instant::now(),
            }),
            config,
        }
    }

    /// Cost of calling `method`.
    pub fn cost_of(&self, method: &str) -> f64 {
        if method == "eth_getLogs" {
            self.config.logs_cost
        } else {
            1.0
        }
    }

    /// Take `cost` tokens if available.
    ///
    /// On failure returns how long to wait until they will be, or
    /// `Duration::MAX` when `cost` exceeds the bucket capacity.
    pub fn try_acquire(&self, cost: f64) -> Result<(), Duration> {
        if cost > self.config.capacity {
            return Err(Duration::MAX);
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.config.refill_rate).min(self.config.capacity);
        state.last_refill = now;

        if state.tokens >= cost {
            state.tokens -= cost;
            return Ok(());
        }
        let deficit = cost - state.tokens;
        if self.config.refill_rate <= 0.0 {
            return Err(Duration::MAX);
        }
        Err(Duration::from_secs_f64(deficit / self.config.refill_rate))
    }
}
