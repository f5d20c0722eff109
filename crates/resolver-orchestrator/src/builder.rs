//! The single construction point §9 asks for: wires every collaborator
//! trait object and pure-Rust component into a [`Shared`], builds the
//! executor/scheduler pair despite their circular reference, and hands back
//! a ready-to-[`Engine::start`] engine.

use resolver_cache::{DurableCacheStore, TieredCache};
use resolver_circuitbreaker::CircuitBreakerRegistry;
use resolver_core::backoff::{BackoffCalculator, BackoffConfig};
use resolver_core::config::EngineConfig;
use resolver_core::events::EventListeners;
use resolver_core::model::ProviderKind;
use resolver_learning::LearningStore;
use resolver_parser::{AiClient, RegexParser};
use resolver_providers::ProviderAdapter;
use resolver_ratelimiter::RateLimiterRegistry;
use resolver_retry::{DurableRetryQueue, RetryScheduler};
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::Engine;
use crate::events::OrchestratorEvent;
use crate::executor::OrchestratorExecutor;
use crate::shared::Shared;

/// Accumulates the collaborator-supplied pieces the core has no opinion
/// about (§1 Non-goals: no bundled HTTP client, no bundled SQL driver) plus
/// the config that tunes the pieces the core does own.
pub struct EngineBuilder {
    config: EngineConfig,
    cache_store: Option<Arc<dyn DurableCacheStore>>,
    retry_queue: Option<Arc<dyn DurableRetryQueue>>,
    learning: Option<Arc<dyn LearningStore>>,
    providers: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    ai_assisted: Option<Arc<dyn ProviderAdapter>>,
    ai_client: Option<Arc<dyn AiClient>>,
    listeners: EventListeners<OrchestratorEvent>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache_store: None,
            retry_queue: None,
            learning: None,
            providers: HashMap::new(),
            ai_assisted: None,
            ai_client: None,
            listeners: EventListeners::new(),
        }
    }

    pub fn cache_store(mut self, store: Arc<dyn DurableCacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn retry_queue(mut self, queue: Arc<dyn DurableRetryQueue>) -> Self {
        self.retry_queue = Some(queue);
        self
    }

    pub fn learning_store(mut self, store: Arc<dyn LearningStore>) -> Self {
        self.learning = Some(store);
        self
    }

    /// Registers a metadata provider adapter. `kind()` on the adapter must
    /// match `kind`; the orchestrator indexes providers by `kind` alone.
    pub fn provider(mut self, kind: ProviderKind, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.insert(kind, adapter);
        self
    }

    /// The keyword-escalation adapter used once every metadata provider has
    /// come up empty (§4.C, §4.H edge case).
    pub fn ai_assisted_provider(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.ai_assisted = Some(adapter);
        self
    }

    /// Used to escalate a low-confidence regex parse (§4.H step 2). Omit to
    /// make low-confidence filenames fail closed to `ManualRequired`.
    pub fn ai_client(mut self, client: Arc<dyn AiClient>) -> Self {
        self.ai_client = Some(client);
        self
    }

    pub fn with_listeners(mut self, listeners: EventListeners<OrchestratorEvent>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Fails only if a mandatory collaborator was never supplied; every
    /// other field falls back to an engine default.
    pub fn build(self) -> Result<Arc<Engine>, &'static str> {
        let cache_store = self.cache_store.ok_or("no durable cache store supplied")?;
        let retry_queue = self.retry_queue.ok_or("no durable retry queue supplied")?;
        let learning = self.learning.ok_or("no learning store supplied")?;

        let backoff_config = BackoffConfig {
            base: self.config.backoff.base(),
            multiplier: self.config.backoff.multiplier,
            cap: self.config.backoff.cap(),
            jitter_pct: self.config.backoff.jitter_pct,
        };

        let shared = Arc::new(Shared {
            cache: Arc::new(TieredCache::new(cache_store, self.config.cache_ttl)),
            breakers: Arc::new(CircuitBreakerRegistry::new(self.config.breaker.clone())),
            limiters: Arc::new(RateLimiterRegistry::new(&self.config.rate_limits)),
            providers: self.providers,
            ai_assisted: self.ai_assisted,
            parser: RegexParser::new(),
            ai_client: self.ai_client,
            learning,
            backoff: Arc::new(BackoffCalculator::new(backoff_config)),
            config: self.config.clone(),
            listeners: self.listeners,
        });

        let executor = Arc::new(OrchestratorExecutor::new(shared.clone()));
        let retry = Arc::new(RetryScheduler::new(
            retry_queue,
            executor.clone(),
            self.config.scheduler,
            shared.backoff.as_ref().clone(),
        ));
        executor.bind_scheduler(Arc::downgrade(&retry));

        Ok(Arc::new(Engine::new(shared, retry)))
    }
}
