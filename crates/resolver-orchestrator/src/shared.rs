//! State shared between [`crate::engine::Engine`] and
//! [`crate::executor::OrchestratorExecutor`]: every collaborator-supplied
//! component plus the pure-Rust pieces (parser, circuit breakers, rate
//! limiters) that don't need a trait object.

use resolver_cache::{DurableCacheStore, TieredCache};
use resolver_circuitbreaker::CircuitBreakerRegistry;
use resolver_core::backoff::BackoffCalculator;
use resolver_core::config::EngineConfig;
use resolver_core::events::EventListeners;
use resolver_core::model::ProviderKind;
use resolver_learning::LearningStore;
use resolver_parser::{AiClient, RegexParser};
use resolver_providers::ProviderAdapter;
use resolver_ratelimiter::RateLimiterRegistry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::events::OrchestratorEvent;

pub struct Shared {
    pub cache: Arc<TieredCache<dyn DurableCacheStore>>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub limiters: Arc<RateLimiterRegistry>,
    pub providers: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    pub ai_assisted: Option<Arc<dyn ProviderAdapter>>,
    pub parser: RegexParser,
    pub ai_client: Option<Arc<dyn AiClient>>,
    pub learning: Arc<dyn LearningStore>,
    pub backoff: Arc<BackoffCalculator>,
    pub config: EngineConfig,
    pub listeners: EventListeners<OrchestratorEvent>,
}
