//! Owns one [`TokenBucket`] per provider, sized from the declared
//! [`RateLimitSettings`] policy (§4.E, §6 defaults: TMDb 40/10s, Douban
//! 1/2s, Wikipedia 1/1s, AI-assisted 10/60s).

use crate::bucket::{RateLimited, TokenBucket};
use crate::events::RateLimiterEvent;
use resolver_core::config::RateLimitSettings;
use resolver_core::events::EventListeners;
use resolver_core::ProviderKind;
use std::collections::HashMap;
use std::time::Instant;

pub struct RateLimiterRegistry {
    buckets: HashMap<ProviderKind, TokenBucket>,
    listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiterRegistry {
    pub fn new(settings: &RateLimitSettings) -> Self {
        let mut buckets = HashMap::new();
        for (provider, policy) in &settings.per_provider {
            buckets.insert(*provider, TokenBucket::new(*policy));
        }
        Self {
            buckets,
            listeners: EventListeners::new(),
        }
    }

    pub fn with_listeners(mut self, listeners: EventListeners<RateLimiterEvent>) -> Self {
        self.listeners = listeners;
        self
    }

    fn bucket(&self, provider: ProviderKind) -> &TokenBucket {
        self.buckets
            .get(&provider)
            .unwrap_or_else(|| panic!("no rate limit policy configured for {provider:?}"))
    }

    /// Non-blocking acquisition. On failure the orchestrator treats the
    /// provider as rate-limited for this attempt and moves on (§4.H step 4).
    pub fn try_acquire(&self, provider: ProviderKind) -> Result<(), RateLimited> {
        let result = self.bucket(provider).try_acquire();
        if let Err(rejection) = result {
            self.listeners.emit(&RateLimiterEvent::CallRejected {
                provider,
                timestamp: Instant::now(),
                retry_after_millis: rejection.retry_after_millis,
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolver_core::config::RatePolicy;
    use std::time::Duration;

    fn settings_with(provider: ProviderKind, policy: RatePolicy) -> RateLimitSettings {
        let mut per_provider = HashMap::new();
        per_provider.insert(provider, policy);
        RateLimitSettings { per_provider }
    }

    #[test]
    fn independent_buckets_per_provider() {
        let mut per_provider = HashMap::new();
        per_provider.insert(ProviderKind::Tmdb, RatePolicy::new(1, Duration::from_secs(60)));
        per_provider.insert(ProviderKind::Douban, RatePolicy::new(1, Duration::from_secs(60)));
        let registry = RateLimiterRegistry::new(&RateLimitSettings { per_provider });
        assert!(registry.try_acquire(ProviderKind::Tmdb).is_ok());
        assert!(registry.try_acquire(ProviderKind::Tmdb).is_err());
        assert!(registry.try_acquire(ProviderKind::Douban).is_ok());
    }

    #[test]
    fn rejection_emits_event() {
        let settings = settings_with(ProviderKind::Wikipedia, RatePolicy::new(1, Duration::from_secs(30)));
        let registry = RateLimiterRegistry::new(&settings);
        assert!(registry.try_acquire(ProviderKind::Wikipedia).is_ok());
        assert!(registry.try_acquire(ProviderKind::Wikipedia).is_err());
    }

    #[test]
    #[should_panic(expected = "no rate limit policy configured")]
    fn missing_policy_panics() {
        let registry = RateLimiterRegistry::new(&RateLimitSettings {
            per_provider: HashMap::new(),
        });
        let _ = registry.try_acquire(ProviderKind::Tmdb);
    }
}
