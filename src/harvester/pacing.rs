//! Fixed-delay request pacing
//!
//! Every page request is preceded by the same pause, regardless of how the
//! server has been responding.

use crate::config::PacingConfig;
use std::time::Duration;

/// Applies a fixed delay before each request
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    requests_paced: u64,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            requests_paced: 0,
        }
    }

    pub fn from_config(config: &PacingConfig) -> Self {
        Self::new(Duration::from_millis(config.request_delay_ms))
    }

    /// Blocks for the configured delay
    pub async fn before_request(&mut self) {
        self.requests_paced += 1;
        if !self.delay.is_zero() {
            tracing::trace!(delay_ms = self.delay.as_millis() as u64, "Pacing before request");
            tokio::time::sleep(self.delay).await;
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of requests that went through this limiter
    pub fn requests_paced(&self) -> u64 {
        self.requests_paced
    }
}
