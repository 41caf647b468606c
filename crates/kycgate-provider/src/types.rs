use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kycgate_core::{BoundingBox, DocumentType, ImageData, MatchStatus, SubjectId};

/// A subject freshly created at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    pub subject_id: SubjectId,
    pub created_at: DateTime<Utc>,
}

/// Document images submitted for verification.
#[derive(Debug, Clone)]
pub struct DocumentSubmission {
    pub front_image: ImageData,
    pub back_image: Option<ImageData>,
    pub document_type: Option<DocumentType>,
}

/// The best face found in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub face_id: String,
    /// Detection score in [0, 1].
    pub score: f64,
    pub bounding_box: Option<BoundingBox>,
}

/// Probability in [0, 1] that a detected face is covered by a mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskScore {
    pub score: f64,
}

/// Raw comparison outcome before the match threshold is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceComparison {
    /// Similarity in [0, 1].
    pub similarity: f64,
    /// Explicit provider decision, when the provider gives one.
    pub decision: Option<MatchStatus>,
}
