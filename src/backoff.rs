// ABOUTME: Exponential backoff arithmetic for SMPP reconnects and SIP retransmissions
// ABOUTME: Delays are pure functions of (attempt, base, cap); jitter takes an injected sample

use rand::Rng;
use std::time::Duration;

/// Reconnect backoff settings (default: 1s base, 60s cap, ±20% jitter)
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub base: Duration,
    pub cap: Duration,
    /// Fraction of the delay by which a single attempt may deviate, 0.0..=1.0
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(60),
            jitter: 0.2,
        }
    }
}

impl BackoffConfig {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Jittered delay before reconnect attempt `attempt` (0-based)
    pub fn delay<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let unit = rng.gen_range(0.0..1.0);
        jittered(
            backoff_delay(attempt, self.base, self.cap),
            self.jitter,
            unit,
            self.base,
            self.cap,
        )
    }
}

/// `min(base * 2^attempt, cap)`, saturating on overflow.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    1u32.checked_shl(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(cap, |delay| delay.min(cap))
}

/// Scales `delay` by `1 ± jitter`, where `unit` in [0, 1) picks the point in
/// that range, then clamps to `[floor, cap]`.
pub fn jittered(delay: Duration, jitter: f64, unit: f64, floor: Duration, cap: Duration) -> Duration {
    let factor = 1.0 + jitter * (2.0 * unit - 1.0);
    delay.mul_f64(factor.max(0.0)).clamp(floor, cap.max(floor))
}

/// SIP retransmission interval: T1 doubling per retransmit, capped at T2.
pub fn retransmit_interval(retransmits: u32, t1: Duration, t2: Duration) -> Duration {
    backoff_delay(retransmits, t1, t2)
}

/// Attempt counter for one reconnect loop.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay for the next attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.config.delay(self.attempt, &mut rand::thread_rng());
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
