use faultline_core::constants::DEFAULT_ATTEMPT_TIMEOUT;
use std::time::Duration;

/// Tuning shared by every strategy run by a [`crate::RecoveryManager`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConfig {
    /// Upper bound for a single `execute` call; `None` waits indefinitely
    pub attempt_timeout: Option<Duration>,
    /// Cap applied to the computed backoff
    pub max_delay: Option<Duration>,
    /// Spread delays by up to ±10%
    pub jitter: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
            max_delay: None,
            jitter: false,
        }
    }
}

impl RecoveryConfig {
    /// Delay to wait before attempt number `attempt` (starting at 1)
    ///
    /// The first attempt runs immediately; attempt `n >= 2` waits
    /// `base * 2^(n-2)`.
    pub fn delay_before(&self, base: Duration, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let exponent = (attempt - 2).min(31);
        let mut delay = base.saturating_mul(1u32 << exponent);

        if let Some(max_delay) = self.max_delay {
            delay = delay.min(max_delay);
        }

        if self.jitter {
            let range = delay.as_millis() as f64 * 0.1;
            let jitter = (rand::random::<f64>() - 0.5) * 2.0 * range;
            let jittered_ms = (delay.as_millis() as f64 + jitter).max(0.0) as u64;
            delay = Duration::from_millis(jittered_ms);
        }

        delay
    }
}
