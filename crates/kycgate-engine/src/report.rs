use serde::{Deserialize, Serialize};

use kycgate_core::{
    ErrorKind, OverallStatus, Stage, SubjectId, VerificationSubject, WorkflowPhase, WorkflowState,
};

/// Snapshot returned by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub subject: VerificationSubject,
    pub phase: WorkflowPhase,
    pub overall_status: OverallStatus,
    pub completed_stages: Vec<Stage>,
    pub artifacts: WorkflowState,
}

impl StatusReport {
    pub fn new(subject: VerificationSubject, state: WorkflowState) -> Self {
        Self {
            subject,
            phase: state.phase(),
            overall_status: state.overall_status(),
            completed_stages: state.completed_stages(),
            artifacts: state,
        }
    }
}

/// Result of one provider-side deletion during termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Deleted,
    /// The provider had nothing to delete (404).
    NotPresent,
    Failed { kind: ErrorKind, message: String },
}

impl DeletionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of `terminate`. Local state is always cleared; provider-side
/// deletions are best-effort and reported individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationReport {
    pub subject_id: SubjectId,
    pub selfie: DeletionOutcome,
    pub liveness: DeletionOutcome,
    pub success: bool,
    pub message: String,
}

impl TerminationReport {
    pub fn new(subject_id: SubjectId, selfie: DeletionOutcome, liveness: DeletionOutcome) -> Self {
        let failed: Vec<&str> = [("selfie", &selfie), ("liveness", &liveness)]
            .into_iter()
            .filter(|(_, outcome)| outcome.is_failed())
            .map(|(name, _)| name)
            .collect();
        let message = if failed.is_empty() {
            "verification data deleted".to_string()
        } else {
            format!(
                "local state cleared; provider deletion failed for: {}",
                failed.join(", ")
            )
        };
        Self {
            subject_id,
            selfie,
            liveness,
            success: true,
            message,
        }
    }

    /// Whether any provider-side deletion failed.
    pub fn has_failures(&self) -> bool {
        self.selfie.is_failed() || self.liveness.is_failed()
    }
}
