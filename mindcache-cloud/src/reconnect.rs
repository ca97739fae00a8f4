use mindcache_core::CloudConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter, reset to the base delay on reaching
/// `Ready`. Doubles on each failed attempt up to `reconnect_cap`.
pub struct ReconnectPolicy {
    base: Duration,
    cap: Duration,
    jitter: f64,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(config: &CloudConfig) -> Self {
        Self {
            base: config.reconnect_base,
            cap: config.reconnect_cap,
            jitter: config.reconnect_jitter,
            attempt: 0,
        }
    }

    /// Returns the delay to wait before the next reconnect attempt and
    /// advances the internal attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.attempt.min(16);
        self.attempt += 1;
        let raw = self.base.saturating_mul(1u32 << exponent).min(self.cap);
        apply_jitter(raw, self.jitter)
    }

    /// Resets the backoff after a successful connection reaches `Ready`.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return delay;
    }
    let mut rng = rand::thread_rng();
    let factor = 1.0 + rng.gen_range(-jitter..=jitter);
    let millis = (delay.as_millis() as f64 * factor).max(0.0);
    Duration::from_millis(millis as u64)
}
