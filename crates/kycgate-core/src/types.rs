use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VerificationError;

/// Provider-assigned subject identifier. Opaque and immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Wrap a provider-issued identifier. Blank identifiers are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, VerificationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(VerificationError::invalid_input(
                "subject identifier must not be empty",
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Onboarding status of a subject, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    InProgress,
    Finished,
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// The person undergoing verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSubject {
    /// Provider-assigned identifier.
    pub id: SubjectId,
    /// Caller-supplied correlation id, if any.
    pub correlation_id: Option<String>,
    /// Current onboarding status.
    pub onboarding_status: OnboardingStatus,
    /// When the provider created the subject.
    pub created_at: DateTime<Utc>,
}

impl VerificationSubject {
    /// A freshly started subject, always `in_progress`.
    pub fn started(
        id: SubjectId,
        correlation_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            correlation_id,
            onboarding_status: OnboardingStatus::InProgress,
            created_at,
        }
    }
}

/// Identity document categories accepted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    IdCard,
    DriversLicense,
    ResidencePermit,
}

impl DocumentType {
    /// Provider wire literal.
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            Self::Passport => "PASSPORT",
            Self::IdCard => "ID_CARD",
            Self::DriversLicense => "DRIVERS_LICENSE",
            Self::ResidencePermit => "RESIDENCE_PERMIT",
        }
    }

    /// Parse a provider literal; unrecognized literals yield `None`.
    pub fn from_provider_str(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PASSPORT" => Some(Self::Passport),
            "ID_CARD" | "IDENTITY_CARD" | "NATIONAL_ID" => Some(Self::IdCard),
            "DRIVERS_LICENSE" | "DRIVING_LICENSE" => Some(Self::DriversLicense),
            "RESIDENCE_PERMIT" => Some(Self::ResidencePermit),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_provider_str())
    }
}

/// Liveness analysis approach the provider applies to a submitted image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    /// No user action; the image is analysed for spoof indicators.
    #[default]
    Passive,
    Blink,
    Smile,
    TurnHead,
}

impl ChallengeType {
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            Self::Passive => "PASSIVE",
            Self::Blink => "BLINK",
            Self::Smile => "SMILE",
            Self::TurnHead => "TURN_HEAD",
        }
    }

    pub fn from_provider_str(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PASSIVE" => Some(Self::Passive),
            "BLINK" => Some(Self::Blink),
            "SMILE" => Some(Self::Smile),
            "TURN_HEAD" | "HEAD_TURN" => Some(Self::TurnHead),
            _ => None,
        }
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_provider_str())
    }
}

/// Extra analysis switches forwarded with liveness calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessOptions {
    /// Ask the provider for a deepfake signal alongside the liveness verdict.
    #[serde(default)]
    pub deepfake_check: bool,
}

/// A provider-issued liveness challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRef {
    pub challenge_id: String,
    pub challenge_type: ChallengeType,
}

/// A provider-side stored selfie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfieRef {
    pub selfie_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// What a probe face is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceReference {
    /// A reference image the provider fetches itself.
    ImageUrl(String),
    /// A previously retrieved face template (e.g. a document portrait).
    Template(String),
}

impl FaceReference {
    /// Build a reference from the two optional request fields.
    ///
    /// Exactly one must be present.
    pub fn from_parts(
        image_url: Option<String>,
        template: Option<String>,
    ) -> Result<Self, VerificationError> {
        let image_url = image_url.filter(|s| !s.trim().is_empty());
        let template = template.filter(|s| !s.trim().is_empty());
        match (image_url, template) {
            (Some(url), None) => Ok(Self::ImageUrl(url)),
            (None, Some(template)) => Ok(Self::Template(template)),
            (None, None) => Err(VerificationError::invalid_input(
                "a reference image url or a reference template is required",
            )),
            (Some(_), Some(_)) => Err(VerificationError::invalid_input(
                "reference image url and reference template are mutually exclusive",
            )),
        }
    }
}

/// Raw image bytes. Travels to the provider as standard base64.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData(Bytes);

impl ImageData {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Decode a base64 payload, rejecting empty or undecodable input.
    pub fn from_base64(encoded: &str) -> Result<Self, VerificationError> {
        let trimmed = encoded.trim();
        // Tolerate data URLs (`data:image/jpeg;base64,...`).
        let payload = match trimmed.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => trimmed,
        };
        let decoded = BASE64
            .decode(payload)
            .map_err(|e| VerificationError::invalid_input(format!("invalid base64 image: {e}")))?;
        if decoded.is_empty() {
            return Err(VerificationError::invalid_input("image payload is empty"));
        }
        Ok(Self(Bytes::from(decoded)))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData(<{} bytes>)", self.0.len())
    }
}
