//! Per-provider token-bucket rate limiting (§4.E). Blocking is never used:
//! callers receive a [`RateLimited`] error carrying the wait that would have
//! been required, and the orchestrator treats that as an immediate
//! retryable failure for the current provider (§4.H step 4).

pub mod bucket;
pub mod events;
pub mod registry;

pub use bucket::{RateLimited, TokenBucket};
pub use events::RateLimiterEvent;
pub use registry::RateLimiterRegistry;
