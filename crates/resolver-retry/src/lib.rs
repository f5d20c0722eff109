//! Durable retry queue and background scheduler (§4.I, §4.J).

pub mod events;
pub mod executor;
pub mod queue;
pub mod scheduler;

pub use events::RetrySchedulerEvent;
pub use executor::{ExecutionFailure, RetryExecutor};
pub use queue::{DurableRetryQueue, RetryQueueError, SqlxDurableRetryQueue};
pub use scheduler::RetryScheduler;
