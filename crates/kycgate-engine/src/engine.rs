use std::sync::Arc;

use kycgate_core::{
    ChallengeRef, ChallengeType, DocumentArtifact, EngineConfig, FaceArtifact, FaceReference,
    ImageData, LivenessArtifact, LivenessOptions, MaskCheck, SelfieRef, SimilarityArtifact,
    SubjectId, VerificationError, VerificationSubject,
};
use kycgate_provider::normalize;
use kycgate_provider::{DocumentSubmission, VerificationProvider};

use crate::report::{DeletionOutcome, StatusReport, TerminationReport};
use crate::store::WorkflowStore;
use crate::tracker::WorkflowTracker;

/// Input for `evaluate_liveness`.
#[derive(Debug, Clone)]
pub struct LivenessSubmission {
    pub image: ImageData,
    /// Previously issued challenge. When absent, one is created first.
    pub challenge_id: Option<String>,
    pub challenge_type: Option<ChallengeType>,
    pub options: Option<LivenessOptions>,
}

/// Sequences verification stages for subjects against the provider.
///
/// Every stage runs under the subject's lock, from the precondition check to
/// the recorded artifact. Nothing is retried.
pub struct OrchestrationEngine {
    provider: Arc<dyn VerificationProvider>,
    tracker: Arc<WorkflowTracker>,
    config: EngineConfig,
    verbose_errors: bool,
}

impl OrchestrationEngine {
    pub fn new(
        provider: Arc<dyn VerificationProvider>,
        store: Arc<dyn WorkflowStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            tracker: Arc::new(WorkflowTracker::new(store)),
            config,
            verbose_errors: true,
        }
    }

    /// Whether provider error text may appear in reports (non-production).
    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    pub fn tracker(&self) -> &Arc<WorkflowTracker> {
        &self.tracker
    }

    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    /// Create a subject at the provider and begin tracking it.
    pub async fn start(
        &self,
        correlation_id: Option<String>,
    ) -> Result<VerificationSubject, VerificationError> {
        let created = self
            .provider
            .create_subject(correlation_id.as_deref())
            .await
            .inspect_err(|e| tracing::warn!(stage = "start", kind = %e.kind(), "{e}"))?;

        let subject =
            VerificationSubject::started(created.subject_id, correlation_id, created.created_at);
        self.tracker.register(subject.clone()).await;
        tracing::info!(
            subject_id = %subject.id,
            correlation_id = subject.correlation_id.as_deref(),
            provider = self.provider.provider_id(),
            "verification started"
        );
        Ok(subject)
    }

    /// Submit identity document images. No earlier stage is required.
    pub async fn verify_document(
        &self,
        id: &SubjectId,
        submission: DocumentSubmission,
    ) -> Result<DocumentArtifact, VerificationError> {
        let _guard = self.tracker.lock(id).await;
        self.tracker.subject(id).await?;

        let artifact = self
            .provider
            .submit_document(id, &submission)
            .await
            .inspect_err(|e| stage_failed(id, "document", e))?;
        self.tracker.record_stage(id, artifact.clone().into()).await?;

        tracing::info!(
            subject_id = %id,
            stage = "document",
            status = %artifact.status,
            confidence = artifact.confidence,
            "document verified"
        );
        Ok(artifact)
    }

    /// Issue a liveness challenge and remember it as the subject's latest.
    pub async fn create_liveness_challenge(
        &self,
        id: &SubjectId,
        challenge_type: Option<ChallengeType>,
        options: Option<LivenessOptions>,
    ) -> Result<ChallengeRef, VerificationError> {
        let _guard = self.tracker.lock(id).await;
        self.tracker.subject(id).await?;

        let challenge_type = challenge_type.unwrap_or(self.config.default_challenge_type);
        let options = options.unwrap_or(self.config.default_liveness_options);
        let challenge = self
            .provider
            .create_liveness_challenge(id, challenge_type, &options)
            .await
            .inspect_err(|e| stage_failed(id, "liveness_challenge", e))?;
        self.tracker.record_challenge(id, challenge.clone()).await?;

        tracing::info!(
            subject_id = %id,
            stage = "liveness_challenge",
            challenge_id = %challenge.challenge_id,
            challenge_type = %challenge.challenge_type,
            "liveness challenge issued"
        );
        Ok(challenge)
    }

    /// Evaluate liveness, creating a challenge first when none is supplied.
    ///
    /// The create-then-submit pair is not atomic: if submission fails the
    /// fresh challenge is simply abandoned.
    pub async fn evaluate_liveness(
        &self,
        id: &SubjectId,
        submission: LivenessSubmission,
    ) -> Result<LivenessArtifact, VerificationError> {
        let _guard = self.tracker.lock(id).await;
        self.tracker.subject(id).await?;

        let options = submission
            .options
            .unwrap_or(self.config.default_liveness_options);
        let challenge = match submission.challenge_id {
            Some(challenge_id) => {
                let issued = self
                    .tracker
                    .get(id)
                    .await
                    .last_challenge
                    .filter(|c| c.challenge_id == challenge_id);
                match (issued, submission.challenge_type) {
                    // The recorded type is the one the challenge was issued with.
                    (Some(issued), Some(requested)) if requested != issued.challenge_type => {
                        return Err(VerificationError::invalid_input(format!(
                            "challenge {challenge_id} was issued as {}, not {requested}",
                            issued.challenge_type
                        )));
                    }
                    (Some(issued), _) => issued,
                    (None, requested) => ChallengeRef {
                        challenge_id,
                        challenge_type: requested.unwrap_or(self.config.default_challenge_type),
                    },
                }
            }
            None => {
                let challenge_type = submission
                    .challenge_type
                    .unwrap_or(self.config.default_challenge_type);
                let challenge = self
                    .provider
                    .create_liveness_challenge(id, challenge_type, &options)
                    .await
                    .inspect_err(|e| stage_failed(id, "liveness", e))?;
                tracing::debug!(
                    subject_id = %id,
                    challenge_id = %challenge.challenge_id,
                    "liveness challenge auto-created"
                );
                challenge
            }
        };

        let artifact = self
            .provider
            .submit_liveness(id, &submission.image, &challenge, &options)
            .await
            .inspect_err(|e| stage_failed(id, "liveness", e))?;
        self.tracker.record_stage(id, artifact.clone().into()).await?;

        tracing::info!(
            subject_id = %id,
            stage = "liveness",
            status = %artifact.status,
            challenge_id = %artifact.challenge_id,
            confidence = artifact.confidence,
            "liveness evaluated"
        );
        Ok(artifact)
    }

    /// Detect a face and run the mask check on it.
    ///
    /// A failed mask check does not fail the stage; the artifact records it
    /// as unavailable and carries a reduced confidence.
    pub async fn detect_face(
        &self,
        id: &SubjectId,
        image: ImageData,
    ) -> Result<FaceArtifact, VerificationError> {
        let _guard = self.tracker.lock(id).await;
        self.tracker.subject(id).await?;

        let detection = self
            .provider
            .detect_face(&image)
            .await
            .inspect_err(|e| stage_failed(id, "face_detection", e))?;

        let mask = match self.provider.check_face_mask(&detection.face_id).await {
            Ok(mask) => MaskCheck::Measured {
                mask_score: mask.score,
            },
            Err(e) => {
                tracing::warn!(
                    subject_id = %id,
                    stage = "face_detection",
                    face_id = %detection.face_id,
                    kind = %e.kind(),
                    "mask check unavailable: {e}"
                );
                MaskCheck::Unavailable {
                    reason: e.public_message(self.verbose_errors),
                }
            }
        };

        let artifact = FaceArtifact::new(
            detection.face_id,
            detection.score,
            detection.bounding_box,
            mask,
        );
        self.tracker.record_stage(id, artifact.clone().into()).await?;

        tracing::info!(
            subject_id = %id,
            stage = "face_detection",
            face_id = %artifact.face_id,
            confidence = artifact.confidence,
            confidence_reduced = artifact.confidence_reduced(),
            "face detected"
        );
        Ok(artifact)
    }

    /// Compare the subject's latest detected face against a reference.
    pub async fn compare_faces(
        &self,
        id: &SubjectId,
        probe_face_id: &str,
        reference: FaceReference,
    ) -> Result<SimilarityArtifact, VerificationError> {
        let _guard = self.tracker.lock(id).await;
        self.tracker.subject(id).await?;

        match self.tracker.get(id).await.face {
            Some(face) if face.face_id == probe_face_id => {}
            Some(face) => {
                return Err(VerificationError::PreconditionFailed(format!(
                    "probe face {probe_face_id} is not the latest detected face ({})",
                    face.face_id
                )))
            }
            None => {
                return Err(VerificationError::PreconditionFailed(
                    "no face has been detected for this subject".into(),
                ))
            }
        }

        let comparison = self
            .provider
            .compare_faces(probe_face_id, &reference)
            .await
            .inspect_err(|e| stage_failed(id, "face_comparison", e))?;
        let artifact =
            normalize::similarity(probe_face_id, &comparison, self.config.match_threshold);
        self.tracker.record_stage(id, artifact.clone().into()).await?;

        tracing::info!(
            subject_id = %id,
            stage = "face_comparison",
            status = %artifact.status,
            similarity = artifact.similarity,
            "faces compared"
        );
        Ok(artifact)
    }

    pub async fn upload_selfie(
        &self,
        id: &SubjectId,
        image: ImageData,
    ) -> Result<SelfieRef, VerificationError> {
        let _guard = self.tracker.lock(id).await;
        self.tracker.subject(id).await?;

        let selfie = self
            .provider
            .upload_selfie(id, &image)
            .await
            .inspect_err(|e| stage_failed(id, "selfie", e))?;
        self.tracker.record_selfie(id, selfie.clone()).await?;
        tracing::info!(subject_id = %id, selfie_id = %selfie.selfie_id, "selfie uploaded");
        Ok(selfie)
    }

    pub async fn fetch_selfie(&self, id: &SubjectId) -> Result<ImageData, VerificationError> {
        self.tracker.subject(id).await?;
        self.provider
            .fetch_selfie(id)
            .await
            .inspect_err(|e| stage_failed(id, "selfie", e))
    }

    /// Subject record, derived phase, artifacts, and overall status.
    pub async fn status(&self, id: &SubjectId) -> Result<StatusReport, VerificationError> {
        let subject = self.tracker.subject(id).await?;
        let state = self.tracker.get(id).await;
        Ok(StatusReport::new(subject, state))
    }

    /// Delete provider-side selfie and liveness data, then clear local state.
    ///
    /// Both deletions are attempted independently and never fail the call.
    pub async fn terminate(&self, id: &SubjectId) -> Result<TerminationReport, VerificationError> {
        let _guard = self.tracker.lock(id).await;
        self.tracker.subject(id).await?;

        let selfie = self.deletion_outcome(id, "selfie", self.provider.delete_selfie(id).await);
        let liveness =
            self.deletion_outcome(id, "liveness", self.provider.delete_liveness(id).await);
        self.tracker.clear(id).await;

        let report = TerminationReport::new(id.clone(), selfie, liveness);
        if report.has_failures() {
            tracing::warn!(subject_id = %id, stage = "terminate", "{}", report.message);
        } else {
            tracing::info!(subject_id = %id, stage = "terminate", "verification terminated");
        }
        Ok(report)
    }

    fn deletion_outcome(
        &self,
        id: &SubjectId,
        what: &str,
        result: Result<(), VerificationError>,
    ) -> DeletionOutcome {
        match result {
            Ok(()) => DeletionOutcome::Deleted,
            Err(e) if e.is_not_found() => DeletionOutcome::NotPresent,
            Err(e) => {
                tracing::warn!(subject_id = %id, kind = %e.kind(), "{what} deletion failed: {e}");
                DeletionOutcome::Failed {
                    kind: e.kind(),
                    message: e.public_message(self.verbose_errors),
                }
            }
        }
    }
}

fn stage_failed(id: &SubjectId, stage: &'static str, err: &VerificationError) {
    tracing::warn!(subject_id = %id, stage, kind = %err.kind(), "stage failed: {err}");
}
