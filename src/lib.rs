//! Media filename resolution engine.
//!
//! A filename produced by a download client goes in; a canonical
//! [`MediaIdentity`] with localized metadata comes out, or the filename is
//! handed to a retry queue or a manual-review queue if it can't be resolved
//! yet. The engine composes five cooperating pieces, each its own crate:
//!
//! - [`resolver_parser`] — structural filename parsing, escalating to an
//!   AI-assisted parser for fansub-style names the regexes can't read.
//! - [`resolver_providers`] — a uniform adapter over TMDb, Douban, Wikipedia
//!   and an AI-assisted keyword-search fallback.
//! - [`resolver_cache`] — a memory-over-durable tiered cache shielding
//!   providers from repeat lookups.
//! - [`resolver_circuitbreaker`] and [`resolver_ratelimiter`] — per-provider
//!   protection so one flaky upstream can't starve the others.
//! - [`resolver_retry`] — a durable queue and backoff-scheduled dispatcher
//!   for transient failures.
//! - [`resolver_learning`] — remembers manual corrections so the same
//!   release family never needs to be resolved by hand twice.
//!
//! [`resolver_orchestrator::Engine`] is where all of this is wired together;
//! build one with [`resolver_orchestrator::EngineBuilder`].

pub use resolver_cache as cache;
pub use resolver_circuitbreaker as circuitbreaker;
pub use resolver_core as core;
pub use resolver_learning as learning;
pub use resolver_orchestrator as orchestrator;
pub use resolver_parser as parser;
pub use resolver_providers as providers;
pub use resolver_ratelimiter as ratelimiter;
pub use resolver_retry as retry;

pub use resolver_core::config::EngineConfig;
pub use resolver_core::model::{MediaIdentity, ParseCandidate, ProviderKind};
pub use resolver_orchestrator::{Engine, EngineBuilder, EngineError, Outcome};
