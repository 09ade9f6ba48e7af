use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Backoff policy for re-establishing a lost inbound subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Give up after this many failed attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Delay for a 1-based attempt number, with ±25% jitter so that many
    /// clients losing the same server do not reconnect in lockstep.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped = self.base_delay(attempt).as_secs_f64();
        let jitter = capped * 0.25;
        let offset = (SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos() as f64
            / u32::MAX as f64)
            * 2.0
            - 1.0;
        Duration::from_secs_f64((capped + jitter * offset).max(0.01))
    }

    /// Un-jittered exponential delay, capped at `max_delay`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }
}
