use resolver_core::events::ResolverEvent;
use resolver_core::model::CacheClass;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum CacheEvent {
    Hit { key: String, class: CacheClass, timestamp: Instant },
    Miss { key: String, class: CacheClass, timestamp: Instant },
    Eviction { key: String, timestamp: Instant },
    Expired { key: String, timestamp: Instant },
}

impl ResolverEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "cache_hit",
            CacheEvent::Miss { .. } => "cache_miss",
            CacheEvent::Eviction { .. } => "cache_eviction",
            CacheEvent::Expired { .. } => "cache_expired",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. }
            | CacheEvent::Expired { timestamp, .. } => *timestamp,
        }
    }
}
