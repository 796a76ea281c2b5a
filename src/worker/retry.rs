use crate::config::WorkerConfig;
use rand::Rng;
use std::time::Duration;

/// Retry schedule for chunk jobs
///
/// Delay before retry `n` (1-based) is `base * 2^(n-1)` capped at `max_delay`;
/// with jitter enabled the actual delay is drawn uniformly from `[0, delay]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
    /// Soft ceiling on one attempt
    pub soft_time_limit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for RetryPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            jitter: config.jitter,
            soft_time_limit: config.soft_time_limit(),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Upper bound of the delay before retry number `retry` (1-based).
    pub fn backoff_ceiling(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_ceiling(retry);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }

        let millis = ceiling.as_millis().min(u64::MAX as u128) as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }
}
