//! Reconnect delay policy

use chatbridge_core::config::ReconnectConfig;
use std::time::Duration;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
    multiplier: f64,
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            initial,
            max: max.max(initial),
            multiplier: multiplier.max(1.0),
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.multiplier,
        )
    }

    /// Delay before the reconnect that follows `attempts` earlier ones
    pub fn delay(&self, attempts: u32) -> Duration {
        let factor = self.multiplier.powi(attempts.min(64) as i32);
        let millis = self.initial.as_millis() as f64 * factor;
        let max = self.max.as_millis() as f64;
        if !millis.is_finite() || millis >= max {
            return self.max;
        }
        Duration::from_millis(millis as u64)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}
