//! Orchestrator outcomes (§6 external interfaces).

use resolver_core::model::MediaIdentity;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resolved(MediaIdentity),
    PendingRetry(String),
    ManualRequired(Vec<String>),
}

impl Outcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }
}
