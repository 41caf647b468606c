//! Deterministic in-memory provider for local runs and tests.
//!
//! Mirrors the provider's observable behaviour closely enough to drive the
//! engine end to end: unknown entities answer 404, deletions of absent data
//! answer 404, and every call is logged. Outcomes are configurable and any
//! operation can be made to fail.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Months, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use kycgate_core::{
    BoundingBox, ChallengeRef, ChallengeType, DeepfakeSignal, DocumentArtifact, DocumentStatus,
    DocumentType, FaceReference, ImageData, LivenessArtifact, LivenessOptions, LivenessStatus,
    MatchStatus, SelfieRef, SubjectId, VerificationError,
};

use crate::normalize::DEEPFAKE_THRESHOLD;
use crate::traits::{ProviderResult, VerificationProvider};
use crate::types::{DocumentSubmission, FaceComparison, FaceDetection, MaskScore, SubjectRef};

/// Provider operations, as recorded in the sandbox call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    CreateSubject,
    SubmitDocument,
    DetectFace,
    CheckFaceMask,
    CompareFaces,
    CreateLivenessChallenge,
    SubmitLiveness,
    UploadSelfie,
    FetchSelfie,
    DeleteSelfie,
    DeleteLiveness,
}

impl fmt::Display for ProviderOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateSubject => "create_subject",
            Self::SubmitDocument => "submit_document",
            Self::DetectFace => "detect_face",
            Self::CheckFaceMask => "check_face_mask",
            Self::CompareFaces => "compare_faces",
            Self::CreateLivenessChallenge => "create_liveness_challenge",
            Self::SubmitLiveness => "submit_liveness",
            Self::UploadSelfie => "upload_selfie",
            Self::FetchSelfie => "fetch_selfie",
            Self::DeleteSelfie => "delete_selfie",
            Self::DeleteLiveness => "delete_liveness",
        };
        f.write_str(name)
    }
}

/// Outcomes the sandbox reports for analysis calls.
#[derive(Debug, Clone)]
pub struct SandboxOutcomes {
    pub document_status: DocumentStatus,
    pub document_confidence: f64,
    pub face_score: f64,
    pub mask_score: f64,
    pub liveness_status: LivenessStatus,
    pub liveness_confidence: f64,
    pub deepfake_score: f64,
    pub similarity: f64,
    pub match_decision: Option<MatchStatus>,
}

impl Default for SandboxOutcomes {
    fn default() -> Self {
        Self {
            document_status: DocumentStatus::Verified,
            document_confidence: 0.97,
            face_score: 0.99,
            mask_score: 0.02,
            liveness_status: LivenessStatus::Live,
            liveness_confidence: 0.96,
            deepfake_score: 0.03,
            similarity: 0.93,
            match_decision: None,
        }
    }
}

#[derive(Debug, Default)]
struct Customer {
    challenges: HashSet<String>,
    selfie: Option<(String, ImageData)>,
    has_liveness: bool,
}

#[derive(Debug, Clone)]
struct Failure {
    error: VerificationError,
    /// `None` fails every call.
    remaining: Option<usize>,
}

/// In-memory provider.
///
/// Clones share state, so a test can keep a handle for assertions after
/// passing one to the engine.
#[derive(Debug, Clone, Default)]
pub struct SandboxProvider {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    customers: DashMap<String, Customer>,
    faces: DashMap<String, ()>,
    templates: DashMap<String, ()>,
    failures: DashMap<ProviderOp, Failure>,
    outcomes: RwLock<SandboxOutcomes>,
    calls: Mutex<Vec<ProviderOp>>,
    latency: RwLock<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn sandbox_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::now_v7().simple())
}

fn not_found(what: &str, id: &str) -> VerificationError {
    VerificationError::ProviderRejected {
        status: 404,
        code: Some("not_found".into()),
        message: format!("{what} {id} not found"),
    }
}

/// Decrements the in-flight counter when a call finishes.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SandboxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: SandboxOutcomes) -> Self {
        let provider = Self::default();
        provider.set_outcomes(outcomes);
        provider
    }

    pub fn set_outcomes(&self, outcomes: SandboxOutcomes) {
        *self
            .inner
            .outcomes
            .write()
            .unwrap_or_else(|e| e.into_inner()) = outcomes;
    }

    /// Adjust the current outcomes in place.
    pub fn update_outcomes(&self, f: impl FnOnce(&mut SandboxOutcomes)) {
        f(&mut self
            .inner
            .outcomes
            .write()
            .unwrap_or_else(|e| e.into_inner()));
    }

    fn outcomes(&self) -> SandboxOutcomes {
        self.inner
            .outcomes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Delay every call, to exercise concurrency.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self
            .inner
            .latency
            .write()
            .unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Make every call to `op` fail with `error`.
    pub fn fail(&self, op: ProviderOp, error: VerificationError) {
        self.inner.failures.insert(
            op,
            Failure {
                error,
                remaining: None,
            },
        );
    }

    /// Make the next call to `op` fail with `error`.
    pub fn fail_once(&self, op: ProviderOp, error: VerificationError) {
        self.inner.failures.insert(
            op,
            Failure {
                error,
                remaining: Some(1),
            },
        );
    }

    pub fn clear_failures(&self) {
        self.inner.failures.clear();
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ProviderOp> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self, op: ProviderOp) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn has_selfie(&self, subject: &SubjectId) -> bool {
        self.inner
            .customers
            .get(subject.as_str())
            .is_some_and(|c| c.selfie.is_some())
    }

    pub fn has_liveness(&self, subject: &SubjectId) -> bool {
        self.inner
            .customers
            .get(subject.as_str())
            .is_some_and(|c| c.has_liveness)
    }

    /// Log the call, apply latency, and fire any injected failure.
    async fn enter(&self, op: ProviderOp) -> ProviderResult<InFlight<'_>> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(op);

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.inner.in_flight);

        let latency = *self
            .inner
            .latency
            .read()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut exhausted = false;
        let injected = self.inner.failures.get_mut(&op).map(|mut failure| {
            if let Some(remaining) = failure.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
                exhausted = *remaining == 0;
            }
            failure.error.clone()
        });
        if exhausted {
            self.inner.failures.remove(&op);
        }
        if let Some(error) = injected {
            tracing::debug!(%op, kind = %error.kind(), "sandbox injected failure");
            return Err(error);
        }
        Ok(guard)
    }

    fn require_customer(&self, subject: &SubjectId) -> ProviderResult<()> {
        if self.inner.customers.contains_key(subject.as_str()) {
            Ok(())
        } else {
            Err(not_found("customer", subject.as_str()))
        }
    }
}

#[async_trait]
impl VerificationProvider for SandboxProvider {
    async fn create_subject(&self, correlation_id: Option<&str>) -> ProviderResult<SubjectRef> {
        let _call = self.enter(ProviderOp::CreateSubject).await?;
        let id = sandbox_id("cus");
        tracing::debug!(subject_id = %id, correlation_id, "sandbox customer created");
        self.inner.customers.insert(id.clone(), Customer::default());
        Ok(SubjectRef {
            subject_id: SubjectId::new(id)?,
            created_at: Utc::now(),
        })
    }

    async fn submit_document(
        &self,
        subject: &SubjectId,
        submission: &DocumentSubmission,
    ) -> ProviderResult<DocumentArtifact> {
        let _call = self.enter(ProviderOp::SubmitDocument).await?;
        self.require_customer(subject)?;
        if submission.front_image.is_empty() {
            return Err(VerificationError::InvalidInput {
                status: Some(422),
                message: "front image is empty".into(),
            });
        }

        let outcomes = self.outcomes();
        let template = sandbox_id("tpl");
        self.inner.templates.insert(template.clone(), ());
        Ok(DocumentArtifact {
            document_type: Some(submission.document_type.unwrap_or(DocumentType::IdCard)),
            issuing_country: Some("UTO".into()),
            document_number: Some(format!("SBX{:06}", submission.front_image.len() % 1_000_000)),
            expiration_date: Utc::now().date_naive().checked_add_months(Months::new(60)),
            status: outcomes.document_status,
            confidence: outcomes.document_confidence.clamp(0.0, 1.0),
            portrait_template: Some(template),
            verified_at: Utc::now(),
        })
    }

    async fn detect_face(&self, image: &ImageData) -> ProviderResult<FaceDetection> {
        let _call = self.enter(ProviderOp::DetectFace).await?;
        if image.is_empty() {
            return Err(VerificationError::invalid_input(
                "no face detected in the submitted image",
            ));
        }
        let face_id = sandbox_id("face");
        self.inner.faces.insert(face_id.clone(), ());
        Ok(FaceDetection {
            face_id,
            score: self.outcomes().face_score.clamp(0.0, 1.0),
            bounding_box: Some(BoundingBox {
                x: 112.0,
                y: 86.0,
                width: 220.0,
                height: 260.0,
            }),
        })
    }

    async fn check_face_mask(&self, face_id: &str) -> ProviderResult<MaskScore> {
        let _call = self.enter(ProviderOp::CheckFaceMask).await?;
        if !self.inner.faces.contains_key(face_id) {
            return Err(not_found("face", face_id));
        }
        Ok(MaskScore {
            score: self.outcomes().mask_score.clamp(0.0, 1.0),
        })
    }

    async fn compare_faces(
        &self,
        probe_face_id: &str,
        reference: &FaceReference,
    ) -> ProviderResult<FaceComparison> {
        let _call = self.enter(ProviderOp::CompareFaces).await?;
        if !self.inner.faces.contains_key(probe_face_id) {
            return Err(not_found("face", probe_face_id));
        }
        match reference {
            FaceReference::Template(template) if !self.inner.templates.contains_key(template) => {
                return Err(not_found("template", template));
            }
            FaceReference::ImageUrl(url)
                if !(url.starts_with("https://") || url.starts_with("http://")) =>
            {
                return Err(VerificationError::InvalidInput {
                    status: Some(422),
                    message: format!("reference image url {url} is not fetchable"),
                });
            }
            _ => {}
        }
        let outcomes = self.outcomes();
        Ok(FaceComparison {
            similarity: outcomes.similarity.clamp(0.0, 1.0),
            decision: outcomes.match_decision,
        })
    }

    async fn create_liveness_challenge(
        &self,
        subject: &SubjectId,
        challenge_type: ChallengeType,
        _options: &LivenessOptions,
    ) -> ProviderResult<ChallengeRef> {
        let _call = self.enter(ProviderOp::CreateLivenessChallenge).await?;
        let mut customer = self
            .inner
            .customers
            .get_mut(subject.as_str())
            .ok_or_else(|| not_found("customer", subject.as_str()))?;
        let challenge_id = sandbox_id("chl");
        customer.challenges.insert(challenge_id.clone());
        Ok(ChallengeRef {
            challenge_id,
            challenge_type,
        })
    }

    async fn submit_liveness(
        &self,
        subject: &SubjectId,
        image: &ImageData,
        challenge: &ChallengeRef,
        options: &LivenessOptions,
    ) -> ProviderResult<LivenessArtifact> {
        let _call = self.enter(ProviderOp::SubmitLiveness).await?;
        let outcomes = self.outcomes();
        let mut customer = self
            .inner
            .customers
            .get_mut(subject.as_str())
            .ok_or_else(|| not_found("customer", subject.as_str()))?;
        if !customer.challenges.contains(&challenge.challenge_id) {
            return Err(not_found("challenge", &challenge.challenge_id));
        }
        if image.is_empty() {
            return Err(VerificationError::InvalidInput {
                status: Some(422),
                message: "liveness image is empty".into(),
            });
        }
        customer.has_liveness = true;

        let deepfake = options.deepfake_check.then(|| {
            let score = outcomes.deepfake_score.clamp(0.0, 1.0);
            DeepfakeSignal {
                score,
                detected: score >= DEEPFAKE_THRESHOLD,
            }
        });
        Ok(LivenessArtifact {
            challenge_id: challenge.challenge_id.clone(),
            challenge_type: challenge.challenge_type,
            confidence: outcomes.liveness_confidence.clamp(0.0, 1.0),
            status: outcomes.liveness_status,
            deepfake,
            evaluated_at: Utc::now(),
        })
    }

    async fn upload_selfie(
        &self,
        subject: &SubjectId,
        image: &ImageData,
    ) -> ProviderResult<SelfieRef> {
        let _call = self.enter(ProviderOp::UploadSelfie).await?;
        let mut customer = self
            .inner
            .customers
            .get_mut(subject.as_str())
            .ok_or_else(|| not_found("customer", subject.as_str()))?;
        let selfie_id = sandbox_id("sf");
        customer.selfie = Some((selfie_id.clone(), image.clone()));
        Ok(SelfieRef {
            selfie_id,
            uploaded_at: Utc::now(),
        })
    }

    async fn fetch_selfie(&self, subject: &SubjectId) -> ProviderResult<ImageData> {
        let _call = self.enter(ProviderOp::FetchSelfie).await?;
        let customer = self
            .inner
            .customers
            .get(subject.as_str())
            .ok_or_else(|| not_found("customer", subject.as_str()))?;
        customer
            .selfie
            .as_ref()
            .map(|(_, image)| image.clone())
            .ok_or_else(|| not_found("selfie for customer", subject.as_str()))
    }

    async fn delete_selfie(&self, subject: &SubjectId) -> ProviderResult<()> {
        let _call = self.enter(ProviderOp::DeleteSelfie).await?;
        let mut customer = self
            .inner
            .customers
            .get_mut(subject.as_str())
            .ok_or_else(|| not_found("customer", subject.as_str()))?;
        match customer.selfie.take() {
            Some(_) => Ok(()),
            None => Err(not_found("selfie for customer", subject.as_str())),
        }
    }

    async fn delete_liveness(&self, subject: &SubjectId) -> ProviderResult<()> {
        let _call = self.enter(ProviderOp::DeleteLiveness).await?;
        let mut customer = self
            .inner
            .customers
            .get_mut(subject.as_str())
            .ok_or_else(|| not_found("customer", subject.as_str()))?;
        if !customer.has_liveness {
            return Err(not_found("liveness data for customer", subject.as_str()));
        }
        customer.has_liveness = false;
        customer.challenges.clear();
        Ok(())
    }

    fn provider_id(&self) -> &str {
        "sandbox"
    }
}
