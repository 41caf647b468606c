//! kycgate Core: Fundamental types, errors, and configuration for the
//! kycgate verification orchestration engine.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod types;
pub mod workflow;

pub use artifacts::{
    BoundingBox, DeepfakeSignal, DocumentArtifact, DocumentStatus, FaceArtifact, LivenessArtifact,
    LivenessStatus, MaskCheck, MatchStatus, SimilarityArtifact, StageArtifact,
};
pub use config::{
    ConfigError, EngineConfig, Environment, ProviderConfig, ProviderCredentials, ProviderMode,
    Secret,
};
pub use error::{ErrorKind, VerificationError};
pub use types::{
    ChallengeRef, ChallengeType, DocumentType, FaceReference, ImageData, LivenessOptions,
    OnboardingStatus, SelfieRef, SubjectId, VerificationSubject,
};
pub use workflow::{OverallStatus, Stage, WorkflowPhase, WorkflowState};
