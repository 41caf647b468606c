//! Provider wire shapes.
//!
//! The provider serves two schema generations side by side: the current
//! nested layout and the legacy flat layout (percent-scale scores). Each
//! response is an untagged enum over both; a body matching neither is a
//! normalization failure.

use serde::{Deserialize, Serialize};

// --- Requests ---

#[derive(Debug, Serialize)]
pub struct CreateCustomerRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct DocumentRequest {
    pub front_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ImageRequest {
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct CompareRequest<'a> {
    pub probe_face_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_template: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeRequest {
    #[serde(rename = "type")]
    pub challenge_type: &'static str,
    pub deepfake_check: bool,
}

#[derive(Debug, Serialize)]
pub struct LivenessRequest<'a> {
    pub image: String,
    pub challenge_id: &'a str,
    pub deepfake_check: bool,
}

// --- Errors ---

/// Structured provider error body, nested or flat.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Nested { error: ErrorDetail },
    Flat(ErrorDetail),
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

impl ErrorBody {
    pub fn into_detail(self) -> ErrorDetail {
        match self {
            Self::Nested { error } => error,
            Self::Flat(detail) => detail,
        }
    }
}

// --- Auth ---

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

// --- Customers ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CustomerResponse {
    Current { customer: CustomerV2 },
    Legacy(CustomerV1),
}

#[derive(Debug, Deserialize)]
pub struct CustomerV2 {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerV1 {
    pub customer_id: String,
    /// Unix seconds.
    #[serde(default)]
    pub created: Option<i64>,
}

// --- Documents ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DocumentResponse {
    Current(DocumentV2),
    Legacy(DocumentV1),
}

#[derive(Debug, Deserialize)]
pub struct DocumentV2 {
    pub document: DocumentFieldsV2,
    pub verification: VerificationV2,
}

#[derive(Debug, Deserialize)]
pub struct DocumentFieldsV2 {
    #[serde(rename = "type", default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub portrait_template: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationV2 {
    pub status: String,
    /// 0..1
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct DocumentV1 {
    pub result: String,
    /// 0..100
    pub confidence: f64,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub issuing_country: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub face_template: Option<String>,
}

// --- Faces ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DetectResponse {
    Current { faces: Vec<FaceV2> },
    Legacy {
        faces_found: u32,
        #[serde(default)]
        face: Option<FaceV1>,
    },
}

#[derive(Debug, Deserialize)]
pub struct FaceV2 {
    pub face_id: String,
    /// 0..1
    pub score: f64,
    #[serde(default)]
    pub bounding_box: Option<BoxV2>,
}

#[derive(Debug, Deserialize)]
pub struct BoxV2 {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Deserialize)]
pub struct FaceV1 {
    pub id: String,
    /// 0..100
    pub confidence: f64,
    /// `[x, y, width, height]`
    #[serde(rename = "box", default)]
    pub bounding_box: Option<[f64; 4]>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MaskResponse {
    Current { mask: MaskV2 },
    Legacy { mask_probability: f64 },
}

#[derive(Debug, Deserialize)]
pub struct MaskV2 {
    /// 0..1
    pub score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CompareResponse {
    Current {
        /// 0..1
        similarity: f64,
        #[serde(default)]
        decision: Option<String>,
    },
    Legacy {
        /// 0..100
        score: f64,
    },
}

// --- Liveness ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChallengeResponse {
    Current { challenge: ChallengeV2 },
    Legacy(ChallengeV1),
}

#[derive(Debug, Deserialize)]
pub struct ChallengeV2 {
    pub id: String,
    #[serde(rename = "type", default)]
    pub challenge_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeV1 {
    pub challenge_id: String,
    #[serde(default)]
    pub challenge_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LivenessResponse {
    Current(LivenessV2),
    Legacy(LivenessV1),
}

#[derive(Debug, Deserialize)]
pub struct LivenessV2 {
    pub liveness: LivenessVerdictV2,
    #[serde(default)]
    pub deepfake: Option<DeepfakeV2>,
}

#[derive(Debug, Deserialize)]
pub struct LivenessVerdictV2 {
    pub status: String,
    /// 0..1
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct DeepfakeV2 {
    /// 0..1
    pub score: f64,
    #[serde(default)]
    pub detected: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LivenessV1 {
    pub is_live: Option<bool>,
    /// 0..100
    pub confidence: f64,
    /// 0..100
    #[serde(default)]
    pub deepfake_score: Option<f64>,
}

// --- Selfies ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SelfieResponse {
    Current { selfie: SelfieV2 },
    Legacy { selfie_id: String },
}

#[derive(Debug, Deserialize)]
pub struct SelfieV2 {
    pub id: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SelfieImageResponse {
    Current { selfie: SelfieV2 },
    Legacy { image: String },
}
