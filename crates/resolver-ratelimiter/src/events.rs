use resolver_core::events::ResolverEvent;
use resolver_core::ProviderKind;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    CallRejected {
        provider: ProviderKind,
        timestamp: Instant,
        retry_after_millis: u64,
    },
}

impl ResolverEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::CallRejected { .. } => "rate_limiter_call_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::CallRejected { timestamp, .. } => *timestamp,
        }
    }
}
