//! Retry policies for transient failures
//!
//! The provisioner never sleeps on its own: it asks the injected
//! [`RetryPolicy`] how many attempts it has, how long to wait after a failed
//! attempt, and lets the policy perform the wait. Tests substitute a policy
//! whose `pause` only records the delay.

use crate::ProvisioningConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Strategy deciding how transient failures are retried.
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    /// Total number of attempts, the first one included. Never below 1.
    fn max_attempts(&self) -> u32;

    /// Delay to wait after failed attempt number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration;

    /// Wait for `delay` before the next attempt.
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Exponential backoff with a cap and optional jitter.
///
/// Attempt `n` waits `initial * multiplier^(n-1)`, capped at `max_delay`. With
/// jitter the wait is drawn uniformly from the upper half of that value, so
/// concurrent callers spread out without ever retrying immediately.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            multiplier: 2.0,
            jitter: true,
        }
    }

    /// Growth factor between consecutive delays (values below 1.0 are raised to 1.0)
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn from_config(config: &ProvisioningConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
        .with_multiplier(config.multiplier)
        .with_jitter(config.jitter)
    }

    /// Delay before jitter is applied
    fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from_config(&ProvisioningConfig::default())
    }
}

#[async_trait]
impl RetryPolicy for ExponentialBackoff {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        if !self.jitter {
            return ceiling;
        }
        let half = ceiling / 2;
        half + half.mul_f64(rand::random::<f64>())
    }
}

/// Same delay between every attempt.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    max_attempts: u32,
    delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

#[async_trait]
impl RetryPolicy for FixedDelay {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}
