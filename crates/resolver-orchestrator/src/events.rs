//! Orchestrator-level events (§6): `resolution_succeeded` and
//! `resolution_manual_required`. Retry lifecycle events
//! (`retry_scheduled`/`retry_started`/`retry_success`/`retry_failed`/`retry_exhausted`)
//! are emitted by [`resolver_retry::RetrySchedulerEvent`] directly; a
//! collaborator subscribes to both event streams.

use resolver_core::events::ResolverEvent;
use resolver_core::model::ProviderOrigin;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    ResolutionSucceeded {
        filename: String,
        provider_origin: ProviderOrigin,
        timestamp: Instant,
    },
    ResolutionPendingRetry {
        filename: String,
        retry_item_id: String,
        timestamp: Instant,
    },
    ResolutionManualRequired {
        filename: String,
        reasons: Vec<String>,
        timestamp: Instant,
    },
    ManualCorrectionRecorded {
        fingerprint: String,
        timestamp: Instant,
    },
}

impl ResolverEvent for OrchestratorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrchestratorEvent::ResolutionSucceeded { .. } => "resolution_succeeded",
            OrchestratorEvent::ResolutionPendingRetry { .. } => "resolution_pending_retry",
            OrchestratorEvent::ResolutionManualRequired { .. } => "resolution_manual_required",
            OrchestratorEvent::ManualCorrectionRecorded { .. } => "manual_correction_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            OrchestratorEvent::ResolutionSucceeded { timestamp, .. }
            | OrchestratorEvent::ResolutionPendingRetry { timestamp, .. }
            | OrchestratorEvent::ResolutionManualRequired { timestamp, .. }
            | OrchestratorEvent::ManualCorrectionRecorded { timestamp, .. } => *timestamp,
        }
    }
}
