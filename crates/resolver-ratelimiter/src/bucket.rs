//! Per-provider token bucket (§4.E).
//!
//! Refill is uniform across the declared window: a bucket sized for `calls`
//! tokens per `per` duration gains `calls / per` tokens every second,
//! computed continuously from elapsed wall-clock time rather than reset in
//! discrete steps. Acquisition never blocks: callers either get a token or
//! an error carrying how long the next token would take to arrive.

use resolver_core::config::RatePolicy;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limited, retry after {retry_after_millis}ms")]
pub struct RateLimited {
    pub retry_after_millis: u64,
}

struct BucketState {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl BucketState {
    fn new(policy: RatePolicy) -> Self {
        let capacity = policy.calls as f64;
        let refill_per_sec = capacity / policy.per().as_secs_f64().max(f64::EPSILON);
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self) -> Result<(), RateLimited> {
        let now = Instant::now();
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            let wait = Duration::from_secs_f64(deficit / self.refill_per_sec.max(f64::EPSILON));
            Err(RateLimited {
                retry_after_millis: wait.as_millis() as u64,
            })
        }
    }
}

/// A token bucket for a single provider, safe to share behind an `Arc`.
pub struct TokenBucket {
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            state: Mutex::new(BucketState::new(policy)),
        }
    }

    /// Attempts to acquire one token. If unavailable and the wait would
    /// exceed `deadline_budget` (when provided), returns `Err` immediately;
    /// the spec treats any unavailability as an immediate `rate_limited`
    /// failure regardless, since the orchestrator never waits on a rate
    /// limiter (§4.H step 4 moves to the next provider).
    pub fn try_acquire(&self) -> Result<(), RateLimited> {
        self.state.lock().unwrap().try_acquire()
    }

    /// Exposes remaining tokens for diagnostics/tests.
    pub fn available(&self) -> f64 {
        let mut guard = self.state.lock().unwrap();
        guard.refill(Instant::now());
        guard.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn exhausts_then_refills() {
        let bucket = TokenBucket::new(RatePolicy::new(2, Duration::from_millis(100)));
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_err());
        sleep(Duration::from_millis(120));
        assert!(bucket.try_acquire().is_ok());
    }

    #[test]
    fn reports_retry_after_on_exhaustion() {
        let bucket = TokenBucket::new(RatePolicy::new(1, Duration::from_secs(2)));
        assert!(bucket.try_acquire().is_ok());
        let err = bucket.try_acquire().unwrap_err();
        assert!(err.retry_after_millis > 0);
    }

    #[test]
    fn douban_policy_is_one_per_two_seconds() {
        let bucket = TokenBucket::new(RatePolicy::new(1, Duration::from_secs(2)));
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_err());
    }
}
