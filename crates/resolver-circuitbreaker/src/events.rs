use crate::circuit::CircuitState;
use resolver_core::events::ResolverEvent;
use resolver_core::ProviderKind;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    StateTransition {
        provider: ProviderKind,
        timestamp: Instant,
        from: CircuitState,
        to: CircuitState,
    },
    CallRejected {
        provider: ProviderKind,
        timestamp: Instant,
    },
}

impl ResolverEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "circuit_state_transition",
            CircuitBreakerEvent::CallRejected { .. } => "circuit_call_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. } => *timestamp,
            CircuitBreakerEvent::CallRejected { timestamp, .. } => *timestamp,
        }
    }
}
