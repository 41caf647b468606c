use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ChallengeType, DocumentType};
use crate::workflow::Stage;

/// Confidence multiplier applied when the mask check could not be performed.
pub const UNCHECKED_MASK_FACTOR: f64 = 0.8;

/// Outcome of document verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Verified,
    Rejected,
    Expired,
    Unknown,
}

impl DocumentStatus {
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Outcome of liveness analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessStatus {
    Live,
    Spoof,
    Unknown,
}

impl LivenessStatus {
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Outcome of a face comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    NotMatched,
    Unknown,
}

impl MatchStatus {
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Spoof => write!(f, "spoof"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::NotMatched => write!(f, "not_matched"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of document submission and verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentArtifact {
    /// Document type as recognised by the provider (None if unrecognised).
    pub document_type: Option<DocumentType>,
    /// ISO 3166 issuing country.
    pub issuing_country: Option<String>,
    pub document_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Face template of the document portrait, usable as a compare reference.
    pub portrait_template: Option<String>,
    pub verified_at: DateTime<Utc>,
}

/// Axis-aligned face bounding box in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Result of the face-mask check attached to a detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MaskCheck {
    /// Probability in [0, 1] that the face is covered.
    Measured { mask_score: f64 },
    /// The check failed; the detection stands with reduced confidence.
    Unavailable { reason: String },
}

/// Result of face detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceArtifact {
    /// Provider face id; the probe for later comparisons.
    pub face_id: String,
    /// Detection score in [0, 1].
    pub detection_score: f64,
    pub bounding_box: Option<BoundingBox>,
    pub mask: MaskCheck,
    /// Detection score adjusted by the mask outcome.
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
}

impl FaceArtifact {
    /// Combine a detection with its mask check.
    pub fn new(
        face_id: String,
        detection_score: f64,
        bounding_box: Option<BoundingBox>,
        mask: MaskCheck,
    ) -> Self {
        let confidence = match &mask {
            MaskCheck::Measured { mask_score } => detection_score * (1.0 - mask_score),
            MaskCheck::Unavailable { .. } => detection_score * UNCHECKED_MASK_FACTOR,
        };
        Self {
            face_id,
            detection_score,
            bounding_box,
            mask,
            confidence: confidence.clamp(0.0, 1.0),
            detected_at: Utc::now(),
        }
    }

    /// Whether the confidence was lowered because the mask check failed.
    pub fn confidence_reduced(&self) -> bool {
        matches!(self.mask, MaskCheck::Unavailable { .. })
    }
}

/// Optional deepfake signal returned with liveness analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeepfakeSignal {
    /// Probability in [0, 1] that the image is synthetic.
    pub score: f64,
    pub detected: bool,
}

/// Result of liveness analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessArtifact {
    /// The challenge actually used for this evaluation.
    pub challenge_id: String,
    pub challenge_type: ChallengeType,
    pub confidence: f64,
    pub status: LivenessStatus,
    pub deepfake: Option<DeepfakeSignal>,
    pub evaluated_at: DateTime<Utc>,
}

/// Result of a face comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityArtifact {
    pub probe_face_id: String,
    /// Similarity in [0, 1].
    pub similarity: f64,
    pub status: MatchStatus,
    pub compared_at: DateTime<Utc>,
}

/// Any artifact a stage can record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "artifact", rename_all = "snake_case")]
pub enum StageArtifact {
    Document(DocumentArtifact),
    Face(FaceArtifact),
    Liveness(LivenessArtifact),
    Similarity(SimilarityArtifact),
}

impl StageArtifact {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Document(_) => Stage::Document,
            Self::Face(_) => Stage::FaceDetection,
            Self::Liveness(_) => Stage::Liveness,
            Self::Similarity(_) => Stage::FaceComparison,
        }
    }
}

impl From<DocumentArtifact> for StageArtifact {
    fn from(a: DocumentArtifact) -> Self {
        Self::Document(a)
    }
}

impl From<FaceArtifact> for StageArtifact {
    fn from(a: FaceArtifact) -> Self {
        Self::Face(a)
    }
}

impl From<LivenessArtifact> for StageArtifact {
    fn from(a: LivenessArtifact) -> Self {
        Self::Liveness(a)
    }
}

impl From<SimilarityArtifact> for StageArtifact {
    fn from(a: SimilarityArtifact) -> Self {
        Self::Similarity(a)
    }
}
