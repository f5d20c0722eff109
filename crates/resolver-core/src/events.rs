//! Generic event system shared by every component crate.
//!
//! Each component (circuit breaker, cache, retry scheduler, orchestrator)
//! defines its own event enum and reuses [`EventListeners`] to dispatch it.
//! This mirrors the approach already used by this workspace's resilience
//! crates: a single generic plumbing module instead of bespoke pub/sub per
//! component.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by a resolver component.
pub trait ResolverEvent: Send + Sync + fmt::Debug {
    fn event_type(&self) -> &'static str;
    fn timestamp(&self) -> Instant;
}

pub trait EventListener<E: ResolverEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners for one event type.
#[derive(Clone)]
pub struct EventListeners<E: ResolverEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ResolverEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits to every listener; a panicking listener is caught so it cannot
    /// prevent the rest from observing the event.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
            if let Err(_panic_payload) = result {
                #[cfg(feature = "tracing")]
                tracing::warn!(event_type = event.event_type(), "resolver event listener panicked");
                #[cfg(feature = "metrics")]
                metrics::counter!("resolver_event_listener_panics_total", "event_type" => event.event_type()).increment(1);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: ResolverEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A function-based listener, for ad-hoc subscriptions.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ResolverEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
