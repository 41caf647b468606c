use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::artifacts::{
    DocumentArtifact, FaceArtifact, LivenessArtifact, SimilarityArtifact, StageArtifact,
};
use crate::types::{ChallengeRef, SelfieRef};

/// Workflow stages that produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Document,
    Liveness,
    FaceDetection,
    FaceComparison,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Liveness => write!(f, "liveness"),
            Self::FaceDetection => write!(f, "face_detection"),
            Self::FaceComparison => write!(f, "face_comparison"),
        }
    }
}

/// Aggregated completion signal computed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    InProgress,
    Completed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Where a subject stands in the verification workflow.
///
/// Phases are derived from the recorded artifacts rather than stored, so
/// resubmitting a stage never strands a subject in a stale phase:
/// - Created: no document, liveness, or comparison recorded
/// - DocumentSubmitted → LivenessSubmitted → FaceCompared: furthest stage present
/// - Completed: every required artifact is present and positive
/// - Deleted: terminated; absorbing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Created,
    DocumentSubmitted,
    LivenessSubmitted,
    FaceCompared,
    Completed,
    Deleted,
}

impl WorkflowPhase {
    /// Whether no further stage may run.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::DocumentSubmitted => write!(f, "document_submitted"),
            Self::LivenessSubmitted => write!(f, "liveness_submitted"),
            Self::FaceCompared => write!(f, "face_compared"),
            Self::Completed => write!(f, "completed"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Latest artifact per stage for one subject.
///
/// An artifact is present iff its stage has succeeded at least once;
/// re-running a stage replaces the previous artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub document: Option<DocumentArtifact>,
    pub liveness: Option<LivenessArtifact>,
    pub face: Option<FaceArtifact>,
    pub similarity: Option<SimilarityArtifact>,
    /// Latest uploaded selfie.
    pub selfie: Option<SelfieRef>,
    /// Latest explicitly issued liveness challenge.
    pub last_challenge: Option<ChallengeRef>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    /// Record a stage artifact, overwriting any previous one for that stage.
    pub fn record(&mut self, artifact: StageArtifact) {
        let stage = artifact.stage();
        match artifact {
            StageArtifact::Document(a) => self.document = Some(a),
            StageArtifact::Liveness(a) => self.liveness = Some(a),
            StageArtifact::Face(a) => self.face = Some(a),
            StageArtifact::Similarity(a) => self.similarity = Some(a),
        }
        self.touch();
        tracing::trace!(%stage, "stage artifact recorded");
    }

    pub fn record_selfie(&mut self, selfie: SelfieRef) {
        self.selfie = Some(selfie);
        self.touch();
    }

    pub fn record_challenge(&mut self, challenge: ChallengeRef) {
        self.last_challenge = Some(challenge);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    /// Whether the given stage has an artifact.
    pub fn has(&self, stage: Stage) -> bool {
        match stage {
            Stage::Document => self.document.is_some(),
            Stage::Liveness => self.liveness.is_some(),
            Stage::FaceDetection => self.face.is_some(),
            Stage::FaceComparison => self.similarity.is_some(),
        }
    }

    /// Stages with an artifact, in workflow order.
    pub fn completed_stages(&self) -> Vec<Stage> {
        [
            Stage::Document,
            Stage::Liveness,
            Stage::FaceDetection,
            Stage::FaceComparison,
        ]
        .into_iter()
        .filter(|s| self.has(*s))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.completed_stages().is_empty()
    }

    /// `Completed` iff document, liveness, and face-match artifacts are all
    /// present and each reports a positive outcome.
    pub fn overall_status(&self) -> OverallStatus {
        let document_ok = self
            .document
            .as_ref()
            .is_some_and(|d| d.status.is_positive());
        let liveness_ok = self
            .liveness
            .as_ref()
            .is_some_and(|l| l.status.is_positive());
        let match_ok = self
            .similarity
            .as_ref()
            .is_some_and(|s| s.status.is_positive());

        if document_ok && liveness_ok && match_ok {
            OverallStatus::Completed
        } else {
            OverallStatus::InProgress
        }
    }

    /// Derive the workflow phase from the recorded artifacts.
    pub fn phase(&self) -> WorkflowPhase {
        if self.overall_status() == OverallStatus::Completed {
            WorkflowPhase::Completed
        } else if self.similarity.is_some() {
            WorkflowPhase::FaceCompared
        } else if self.liveness.is_some() {
            WorkflowPhase::LivenessSubmitted
        } else if self.document.is_some() {
            WorkflowPhase::DocumentSubmitted
        } else {
            WorkflowPhase::Created
        }
    }
}
