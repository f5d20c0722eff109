//! Core infrastructure shared by every crate in the media resolution engine:
//! the data model (§3), the error taxonomy and classifier (§7, §4.L), the
//! backoff calculator (§4.A), the generic event system, and engine-wide
//! configuration (§6).

pub mod backoff;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;

pub use backoff::{BackoffCalculator, BackoffConfig, JitterSource, SystemRng};
pub use config::{ConfigError, EngineConfig};
pub use error::{ErrorCode, ProviderError, ResolverError};
pub use events::{EventListener, EventListeners, FnListener, ResolverEvent};
pub use model::{
    CacheClass, CacheEntry, LearningRule, MediaIdentity, MediaKind, ParseCandidate, ParserOrigin,
    ProviderKind, ProviderOrigin, RetryItem, TaskType, now_unix,
};
