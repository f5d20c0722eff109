//! Composes every other `resolver-*` crate into the single engine described
//! by §4.H: parsing, caching, the provider chain, circuit breaking, rate
//! limiting, retry scheduling and the learning store acting as one
//! resolution pipeline.

pub mod builder;
pub mod engine;
pub mod events;
pub mod executor;
pub mod outcome;
pub mod payload;
pub mod resolve;
pub mod retry_item;
pub mod shared;

pub use builder::EngineBuilder;
pub use engine::{Engine, EngineError};
pub use events::OrchestratorEvent;
pub use executor::OrchestratorExecutor;
pub use outcome::Outcome;
