//! Pure backoff math for the retry scheduler.
//!
//! `delay(attempt)` is the only contract the rest of the engine depends on:
//! `min(base * multiplier^attempt, cap)`, then a symmetric jitter of
//! `jitter_pct * base_delay` is added and the result clamped to zero.
//! Negative attempts are treated as zero.

use std::time::Duration;

/// Tuning knobs for [`BackoffCalculator`]. Defaults match the distilled
/// specification: base=1s, multiplier=2, cap=8s, jitter_pct=10%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub base: Duration,
    pub multiplier: f64,
    pub cap: Duration,
    pub jitter_pct: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            cap: Duration::from_secs(8),
            jitter_pct: 0.10,
        }
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.multiplier < 1.0 {
            return Err("backoff multiplier must be >= 1.0");
        }
        if !(0.0..=1.0).contains(&self.jitter_pct) {
            return Err("backoff jitter_pct must be within [0.0, 1.0]");
        }
        Ok(())
    }
}

/// A source of randomness for jitter, abstracted so tests can inject a
/// deterministic sequence. Production callers use [`SystemRng`].
pub trait JitterSource: Send + Sync {
    /// Returns a value in `[-1.0, 1.0]` used to scale jitter magnitude.
    fn sample(&self) -> f64;
}

/// Jitter source backed by a crypto-strong randomness source, as required by
/// the external-interfaces section of the specification.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRng;

impl JitterSource for SystemRng {
    fn sample(&self) -> f64 {
        rand::rng().random_range(-1.0..=1.0)
    }
}

/// Computes retry delays per §4.A. Stateless and cheap to clone.
#[derive(Clone)]
pub struct BackoffCalculator<R: JitterSource = SystemRng> {
    config: BackoffConfig,
    rng: R,
}

impl BackoffCalculator<SystemRng> {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            rng: SystemRng,
        }
    }
}

impl<R: JitterSource> BackoffCalculator<R> {
    pub fn with_rng(config: BackoffConfig, rng: R) -> Self {
        Self { config, rng }
    }

    fn attempt_index(attempt: i64) -> u32 {
        attempt.max(0) as u32
    }

    /// Deterministic delay with no jitter applied; used for testing and as
    /// the basis the jittered variant scales against.
    pub fn delay_no_jitter(&self, attempt: i64) -> Duration {
        let attempt = Self::attempt_index(attempt);
        let scaled = self.config.base.mul_f64(self.config.multiplier.powi(attempt as i32));
        scaled.min(self.config.cap)
    }

    /// Production delay: `delay_no_jitter` plus symmetric jitter proportional
    /// to that attempt's own delay, clamped to a non-negative duration.
    pub fn delay(&self, attempt: i64) -> Duration {
        let base = self.delay_no_jitter(attempt);
        let jitter_magnitude = base.as_secs_f64() * self.config.jitter_pct;
        let jitter = jitter_magnitude * self.rng.sample();
        let seconds = (base.as_secs_f64() + jitter).max(0.0);
        Duration::from_secs_f64(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedJitter(f64);
    impl JitterSource for FixedJitter {
        fn sample(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn sequence_without_jitter_matches_spec() {
        let calc = BackoffCalculator::with_rng(BackoffConfig::default(), FixedJitter(0.0));
        assert_eq!(calc.delay_no_jitter(0), Duration::from_secs(1));
        assert_eq!(calc.delay_no_jitter(1), Duration::from_secs(2));
        assert_eq!(calc.delay_no_jitter(2), Duration::from_secs(4));
        assert_eq!(calc.delay_no_jitter(3), Duration::from_secs(8));
        assert_eq!(calc.delay_no_jitter(4), Duration::from_secs(8));
    }

    #[test]
    fn negative_attempt_treated_as_zero() {
        let calc = BackoffCalculator::with_rng(BackoffConfig::default(), FixedJitter(0.0));
        assert_eq!(calc.delay_no_jitter(-1), calc.delay_no_jitter(0));
        assert_eq!(calc.delay(-1), calc.delay(0));
    }

    #[test]
    fn monotonic_until_cap() {
        let calc = BackoffCalculator::with_rng(BackoffConfig::default(), FixedJitter(0.0));
        for a in 0..10 {
            assert!(calc.delay_no_jitter(a) <= calc.delay_no_jitter(a + 1));
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for &s in &[-1.0, -0.5, 0.0, 0.5, 1.0] {
            let calc = BackoffCalculator::with_rng(BackoffConfig::default(), FixedJitter(s));
            for attempt in 0..6 {
                let base = calc.delay_no_jitter(attempt).as_secs_f64();
                let jittered = calc.delay(attempt).as_secs_f64();
                assert!(jittered >= (base * 0.9) - 1e-9);
                assert!(jittered <= (base * 1.1) + 1e-9);
                assert!(jittered >= 0.0);
            }
        }
    }

    proptest::proptest! {
        #[test]
        fn delay_always_within_jitter_envelope(attempt in 0i64..50, jitter in -1.0f64..=1.0f64) {
            let calc = BackoffCalculator::with_rng(BackoffConfig::default(), FixedJitter(jitter));
            let base = calc.delay_no_jitter(attempt).as_secs_f64();
            let got = calc.delay(attempt).as_secs_f64();
            proptest::prop_assert!(got >= 0.0);
            proptest::prop_assert!(got <= base * 1.1 + 1e-9);
        }
    }
}
