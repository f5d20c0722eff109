//! A single provider's circuit state machine (§4.D).

use crate::events::CircuitBreakerEvent;
use resolver_core::config::BreakerSettings;
use resolver_core::events::EventListeners;
use resolver_core::ProviderKind;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Per-provider failure/success counters within the failure window.
struct Window {
    failures: VecDeque<Instant>,
}

impl Window {
    fn new() -> Self {
        Self {
            failures: VecDeque::new(),
        }
    }

    fn record_failure(&mut self, now: Instant, window: Duration) -> usize {
        self.failures.push_back(now);
        self.prune(now, window);
        self.failures.len()
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&front) = self.failures.front() {
            if now.duration_since(front) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn clear(&mut self) {
        self.failures.clear();
    }
}

/// Per-provider circuit breaker. Process-local, reset to `Closed` on
/// restart, matching the §4.D invariant that breaker state is never
/// persisted.
pub struct Circuit {
    provider: ProviderKind,
    state: CircuitState,
    state_atomic: std::sync::Arc<AtomicU8>,
    opened_at: Option<Instant>,
    last_success_at: Option<Instant>,
    window: Window,
    half_open_probe_in_flight: bool,
}

impl Circuit {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            state: CircuitState::Closed,
            state_atomic: std::sync::Arc::new(AtomicU8::new(CircuitState::Closed as u8)),
            opened_at: None,
            last_success_at: None,
            window: Window::new(),
            half_open_probe_in_flight: false,
        }
    }

    /// Lock-free read of the current state, usable by readers that don't
    /// need to mutate (§5: "reads may be lock-free where the platform allows").
    pub fn state_atomic(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// `try_acquire` is called before every provider call. While `Open` and
    /// the recovery timeout has not elapsed, calls are rejected without
    /// counting as a failure (§4.D, §4.H step 4). Transitioning to
    /// `HalfOpen` admits exactly one probe call; further calls are rejected
    /// until that probe resolves.
    pub fn try_acquire(&mut self, settings: &BreakerSettings, listeners: &EventListeners<CircuitBreakerEvent>) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = self.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= settings.recovery_timeout() {
                    self.transition_to(CircuitState::HalfOpen, listeners);
                    self.half_open_probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_probe_in_flight {
                    false
                } else {
                    self.half_open_probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&mut self, listeners: &EventListeners<CircuitBreakerEvent>) {
        self.last_success_at = Some(Instant::now());
        self.half_open_probe_in_flight = false;
        match self.state {
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Closed, listeners);
            }
            _ => {
                self.window.clear();
            }
        }
    }

    pub fn record_failure(&mut self, settings: &BreakerSettings, listeners: &EventListeners<CircuitBreakerEvent>) {
        self.half_open_probe_in_flight = false;
        match self.state {
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open, listeners);
            }
            CircuitState::Closed => {
                let count = self.window.record_failure(Instant::now(), settings.failure_window());
                if count >= settings.failure_threshold as usize {
                    self.transition_to(CircuitState::Open, listeners);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to(&mut self, state: CircuitState, listeners: &EventListeners<CircuitBreakerEvent>) {
        if self.state == state {
            return;
        }
        let from = self.state;
        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.window.clear();
        if state == CircuitState::Open {
            self.opened_at = Some(Instant::now());
        }

        #[cfg(feature = "tracing")]
        tracing::info!(provider = self.provider.as_str(), ?from, to = ?state, "circuit breaker state transition");

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "circuitbreaker_transitions_total",
            "provider" => self.provider.as_str(),
            "from" => format!("{from:?}"),
            "to" => format!("{state:?}")
        )
        .increment(1);

        listeners.emit(&CircuitBreakerEvent::StateTransition {
            provider: self.provider,
            timestamp: Instant::now(),
            from,
            to: state,
        });
    }
}
