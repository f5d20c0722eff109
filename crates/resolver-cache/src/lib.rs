//! Tiered caching for resolved media metadata and AI parses (§4.B). The
//! durable tier is a trait the caller supplies; this crate only assumes one
//! exists, per §6's framing of storage as a collaborator concern.

pub mod durable;
pub mod events;
pub mod key;
pub mod memory;
pub mod tiered;

pub use durable::{DurableCacheError, DurableCacheStore, SqlxDurableCacheStore};
pub use events::CacheEvent;
pub use memory::MemoryTier;
pub use tiered::TieredCache;
