use resolver_core::error::ErrorCode;
use resolver_core::events::ResolverEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum RetrySchedulerEvent {
    AttemptStarted {
        id: String,
        attempt: u32,
        timestamp: Instant,
    },
    AttemptSucceeded {
        id: String,
        timestamp: Instant,
    },
    AttemptFailed {
        id: String,
        attempt: u32,
        code: ErrorCode,
        timestamp: Instant,
    },
    Exhausted {
        id: String,
        timestamp: Instant,
    },
}

impl ResolverEvent for RetrySchedulerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetrySchedulerEvent::AttemptStarted { .. } => "retry_attempt_started",
            RetrySchedulerEvent::AttemptSucceeded { .. } => "retry_attempt_succeeded",
            RetrySchedulerEvent::AttemptFailed { .. } => "retry_attempt_failed",
            RetrySchedulerEvent::Exhausted { .. } => "retry_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetrySchedulerEvent::AttemptStarted { timestamp, .. }
            | RetrySchedulerEvent::AttemptSucceeded { timestamp, .. }
            | RetrySchedulerEvent::AttemptFailed { timestamp, .. }
            | RetrySchedulerEvent::Exhausted { timestamp, .. } => *timestamp,
        }
    }
}
