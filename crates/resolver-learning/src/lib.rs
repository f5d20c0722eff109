//! Learning store (§4.K): remembers manually confirmed identities keyed by a
//! normalized filename fingerprint, so a correction made once short-circuits
//! every future resolution of the same release family.

pub mod fingerprint;
pub mod store;

pub use fingerprint::fingerprint;
pub use store::{memory_store::MemoryLearningStore, LearningStore, LearningStoreError, SqlxLearningStore};
