//! Owns one [`Circuit`] per provider and serializes access to it behind a
//! per-provider lock, per §5's "mutated under a per-provider lock" rule.

use crate::circuit::{Circuit, CircuitState};
use crate::events::CircuitBreakerEvent;
use resolver_core::config::BreakerSettings;
use resolver_core::events::EventListeners;
use resolver_core::ProviderKind;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct CircuitBreakerRegistry {
    settings: BreakerSettings,
    circuits: HashMap<ProviderKind, Mutex<Circuit>>,
    listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerRegistry {
    pub fn new(settings: BreakerSettings) -> Self {
        let mut circuits = HashMap::new();
        for provider in ProviderKind::METADATA_PROVIDERS {
            circuits.insert(provider, Mutex::new(Circuit::new(provider)));
        }
        circuits.insert(
            ProviderKind::AiAssisted,
            Mutex::new(Circuit::new(ProviderKind::AiAssisted)),
        );
        Self {
            settings,
            circuits,
            listeners: EventListeners::new(),
        }
    }

    pub fn with_listeners(mut self, listeners: EventListeners<CircuitBreakerEvent>) -> Self {
        self.listeners = listeners;
        self
    }

    fn circuit(&self, provider: ProviderKind) -> &Mutex<Circuit> {
        self.circuits
            .get(&provider)
            .expect("every ProviderKind has a registered circuit")
    }

    /// Read-only state lookup; used by the orchestrator to decide whether a
    /// provider should be skipped before even attempting acquisition.
    pub fn state(&self, provider: ProviderKind) -> CircuitState {
        self.circuit(provider).lock().unwrap().state_atomic()
    }

    /// Attempts to acquire a call slot for `provider`. Returns `false` if
    /// the circuit is open (or a half-open probe is already in flight),
    /// meaning the orchestrator must skip this provider without treating it
    /// as a failure.
    pub fn try_acquire(&self, provider: ProviderKind) -> bool {
        let mut circuit = self.circuit(provider).lock().unwrap();
        let acquired = circuit.try_acquire(&self.settings, &self.listeners);
        if !acquired {
            self.listeners.emit(&CircuitBreakerEvent::CallRejected {
                provider,
                timestamp: std::time::Instant::now(),
            });
        }
        acquired
    }

    pub fn record_success(&self, provider: ProviderKind) {
        self.circuit(provider)
            .lock()
            .unwrap()
            .record_success(&self.listeners);
    }

    pub fn record_failure(&self, provider: ProviderKind) {
        self.circuit(provider)
            .lock()
            .unwrap()
            .record_failure(&self.settings, &self.listeners);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_provider_has_independent_state() {
        let registry = CircuitBreakerRegistry::new(BreakerSettings {
            failure_threshold: 1,
            failure_window_secs: 60,
            recovery_timeout_secs: 3600,
        });
        registry.try_acquire(ProviderKind::Tmdb);
        registry.record_failure(ProviderKind::Tmdb);
        assert_eq!(registry.state(ProviderKind::Tmdb), CircuitState::Open);
        assert_eq!(registry.state(ProviderKind::Douban), CircuitState::Closed);
    }

    #[test]
    fn acquire_fails_while_open() {
        let registry = CircuitBreakerRegistry::new(BreakerSettings {
            failure_threshold: 1,
            failure_window_secs: 60,
            recovery_timeout_secs: 3600,
        });
        registry.try_acquire(ProviderKind::Tmdb);
        registry.record_failure(ProviderKind::Tmdb);
        assert!(!registry.try_acquire(ProviderKind::Tmdb));
    }
}
