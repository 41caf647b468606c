use async_trait::async_trait;

use kycgate_core::{
    ChallengeRef, ChallengeType, DocumentArtifact, FaceReference, ImageData, LivenessArtifact,
    LivenessOptions, SelfieRef, SubjectId, VerificationError,
};

use crate::types::{DocumentSubmission, FaceComparison, FaceDetection, MaskScore, SubjectRef};

pub type ProviderResult<T> = Result<T, VerificationError>;

/// Verification provider interface.
///
/// One operation per provider capability. Implementations never retry:
/// several calls have provider-side effects (creating subjects, issuing
/// challenges), so a blind retry can duplicate them.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Create a new identity record at the provider.
    async fn create_subject(&self, correlation_id: Option<&str>) -> ProviderResult<SubjectRef>;

    /// Submit document images and return the verification result.
    async fn submit_document(
        &self,
        subject: &SubjectId,
        submission: &DocumentSubmission,
    ) -> ProviderResult<DocumentArtifact>;

    /// Detect the most prominent face in an image.
    async fn detect_face(&self, image: &ImageData) -> ProviderResult<FaceDetection>;

    /// Score whether a previously detected face is masked.
    async fn check_face_mask(&self, face_id: &str) -> ProviderResult<MaskScore>;

    /// Compare a detected face against a reference image or template.
    async fn compare_faces(
        &self,
        probe_face_id: &str,
        reference: &FaceReference,
    ) -> ProviderResult<FaceComparison>;

    /// Issue a liveness challenge for a subject.
    async fn create_liveness_challenge(
        &self,
        subject: &SubjectId,
        challenge_type: ChallengeType,
        options: &LivenessOptions,
    ) -> ProviderResult<ChallengeRef>;

    /// Submit an image against a challenge and return the liveness verdict.
    ///
    /// The returned artifact is stamped with `challenge`.
    async fn submit_liveness(
        &self,
        subject: &SubjectId,
        image: &ImageData,
        challenge: &ChallengeRef,
        options: &LivenessOptions,
    ) -> ProviderResult<LivenessArtifact>;

    async fn upload_selfie(&self, subject: &SubjectId, image: &ImageData)
        -> ProviderResult<SelfieRef>;

    async fn fetch_selfie(&self, subject: &SubjectId) -> ProviderResult<ImageData>;

    async fn delete_selfie(&self, subject: &SubjectId) -> ProviderResult<()>;

    async fn delete_liveness(&self, subject: &SubjectId) -> ProviderResult<()>;

    /// Short identifier for logs (e.g. "http", "sandbox").
    fn provider_id(&self) -> &str;
}
