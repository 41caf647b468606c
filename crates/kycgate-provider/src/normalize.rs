//! Result normalizer: provider wire shapes → internal artifact schema.
//!
//! Every function here is pure. Scores are clamped into `[0, 1]` (legacy
//! percent-scale fields are rescaled first) and unrecognized status literals
//! map to the local `Unknown` variant.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;

use kycgate_core::{
    BoundingBox, ChallengeRef, ChallengeType, DeepfakeSignal, DocumentArtifact, DocumentStatus,
    DocumentType, ImageData, LivenessArtifact, LivenessStatus, MatchStatus, SelfieRef,
    SimilarityArtifact, SubjectId, VerificationError,
};

use crate::types::{FaceComparison, FaceDetection, MaskScore, SubjectRef};
use crate::wire::{
    ChallengeResponse, CompareResponse, CustomerResponse, DetectResponse, DocumentResponse,
    LivenessResponse, MaskResponse, SelfieImageResponse, SelfieResponse,
};

/// Deepfake probability above which the signal counts as detected when the
/// provider gives no explicit flag.
pub const DEEPFAKE_THRESHOLD: f64 = 0.5;

/// Parse a provider body against the known schema versions.
pub fn decode<T: DeserializeOwned>(operation: &str, body: &str) -> Result<T, VerificationError> {
    serde_json::from_str(body).map_err(|e| {
        VerificationError::NormalizationFailure(format!(
            "{operation} response matched no known schema: {e}"
        ))
    })
}

/// Validate a score already on the unit scale and clamp it into `[0, 1]`.
pub fn unit_interval(value: f64, field: &str) -> Result<f64, VerificationError> {
    if !value.is_finite() {
        return Err(VerificationError::NormalizationFailure(format!(
            "{field} is not a finite number"
        )));
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Rescale a percent-scale score into `[0, 1]`.
pub fn percent(value: f64, field: &str) -> Result<f64, VerificationError> {
    unit_interval(value / 100.0, field)
}

pub fn document_status(literal: &str) -> DocumentStatus {
    match literal.to_ascii_uppercase().as_str() {
        "VERIFIED" | "VALID" | "APPROVED" => DocumentStatus::Verified,
        "REJECTED" | "INVALID" | "DECLINED" | "FRAUD" => DocumentStatus::Rejected,
        "EXPIRED" => DocumentStatus::Expired,
        other => {
            tracing::debug!(status = other, "unrecognized document status");
            DocumentStatus::Unknown
        }
    }
}

pub fn liveness_status(literal: &str) -> LivenessStatus {
    match literal.to_ascii_uppercase().as_str() {
        "LIVE" | "GENUINE" | "REAL" => LivenessStatus::Live,
        "SPOOF" | "FAKE" | "NOT_LIVE" => LivenessStatus::Spoof,
        other => {
            tracing::debug!(status = other, "unrecognized liveness status");
            LivenessStatus::Unknown
        }
    }
}

pub fn match_decision(literal: &str) -> MatchStatus {
    match literal.to_ascii_uppercase().as_str() {
        "MATCH" | "MATCHED" | "SAME_PERSON" => MatchStatus::Matched,
        "NO_MATCH" | "NOT_MATCHED" | "MISMATCH" | "DIFFERENT_PERSON" => MatchStatus::NotMatched,
        other => {
            tracing::debug!(decision = other, "unrecognized match decision");
            MatchStatus::Unknown
        }
    }
}

fn expiration_date(raw: Option<String>) -> Option<NaiveDate> {
    let raw = raw?;
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(value = %raw, error = %e, "unparseable document expiration date");
            None
        }
    }
}

fn document_type(raw: Option<String>) -> Option<DocumentType> {
    raw.as_deref().and_then(DocumentType::from_provider_str)
}

pub fn subject(resp: CustomerResponse) -> Result<SubjectRef, VerificationError> {
    let (id, created_at) = match resp {
        CustomerResponse::Current { customer } => (customer.id, customer.created_at),
        CustomerResponse::Legacy(c) => (
            c.customer_id,
            c.created.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        ),
    };
    let subject_id = SubjectId::new(id).map_err(|_| {
        VerificationError::NormalizationFailure("provider returned an empty customer id".into())
    })?;
    Ok(SubjectRef {
        subject_id,
        created_at: created_at.unwrap_or_else(Utc::now),
    })
}

pub fn document(resp: DocumentResponse) -> Result<DocumentArtifact, VerificationError> {
    let artifact = match resp {
        DocumentResponse::Current(v2) => DocumentArtifact {
            document_type: document_type(v2.document.document_type),
            issuing_country: v2.document.country,
            document_number: v2.document.number,
            expiration_date: expiration_date(v2.document.expiry_date),
            status: document_status(&v2.verification.status),
            confidence: unit_interval(v2.verification.score, "verification.score")?,
            portrait_template: v2.document.portrait_template,
            verified_at: Utc::now(),
        },
        DocumentResponse::Legacy(v1) => DocumentArtifact {
            document_type: document_type(v1.document_type),
            issuing_country: v1.issuing_country,
            document_number: v1.document_number,
            expiration_date: expiration_date(v1.expiration_date),
            status: document_status(&v1.result),
            confidence: percent(v1.confidence, "confidence")?,
            portrait_template: v1.face_template,
            verified_at: Utc::now(),
        },
    };
    Ok(artifact)
}

/// Pick the highest-scoring face. An image without a face is unusable input.
pub fn face_detection(resp: DetectResponse) -> Result<FaceDetection, VerificationError> {
    let best = match resp {
        DetectResponse::Current { faces } => {
            let mut best: Option<FaceDetection> = None;
            for face in faces {
                let candidate = FaceDetection {
                    face_id: face.face_id,
                    score: unit_interval(face.score, "faces[].score")?,
                    bounding_box: face.bounding_box.map(|b| BoundingBox {
                        x: b.x,
                        y: b.y,
                        width: b.width,
                        height: b.height,
                    }),
                };
                if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
            best
        }
        DetectResponse::Legacy { face, .. } => match face {
            Some(face) => Some(FaceDetection {
                face_id: face.id,
                score: percent(face.confidence, "face.confidence")?,
                bounding_box: face.bounding_box.map(|[x, y, width, height]| BoundingBox {
                    x,
                    y,
                    width,
                    height,
                }),
            }),
            None => None,
        },
    };
    best.ok_or_else(|| VerificationError::invalid_input("no face detected in the submitted image"))
}

pub fn mask(resp: MaskResponse) -> Result<MaskScore, VerificationError> {
    let score = match resp {
        MaskResponse::Current { mask } => unit_interval(mask.score, "mask.score")?,
        MaskResponse::Legacy { mask_probability } => percent(mask_probability, "mask_probability")?,
    };
    Ok(MaskScore { score })
}

pub fn comparison(resp: CompareResponse) -> Result<FaceComparison, VerificationError> {
    match resp {
        CompareResponse::Current {
            similarity,
            decision,
        } => Ok(FaceComparison {
            similarity: unit_interval(similarity, "similarity")?,
            decision: decision.as_deref().map(match_decision),
        }),
        CompareResponse::Legacy { score } => Ok(FaceComparison {
            similarity: percent(score, "score")?,
            decision: None,
        }),
    }
}

/// Resolve the match status: an explicit, recognized provider decision wins;
/// otherwise the similarity is held against `threshold`.
pub fn match_status(comparison: &FaceComparison, threshold: f64) -> MatchStatus {
    match comparison.decision {
        Some(MatchStatus::Unknown) | None => {
            if comparison.similarity >= threshold {
                MatchStatus::Matched
            } else {
                MatchStatus::NotMatched
            }
        }
        Some(decision) => decision,
    }
}

pub fn similarity(
    probe_face_id: &str,
    comparison: &FaceComparison,
    threshold: f64,
) -> SimilarityArtifact {
    SimilarityArtifact {
        probe_face_id: probe_face_id.to_string(),
        similarity: comparison.similarity.clamp(0.0, 1.0),
        status: match_status(comparison, threshold),
        compared_at: Utc::now(),
    }
}

/// The provider may echo an unfamiliar type literal; the requested type is
/// kept in that case.
pub fn challenge(resp: ChallengeResponse, requested: ChallengeType) -> ChallengeRef {
    let (challenge_id, echoed) = match resp {
        ChallengeResponse::Current { challenge } => (challenge.id, challenge.challenge_type),
        ChallengeResponse::Legacy(c) => (c.challenge_id, c.challenge_type),
    };
    let challenge_type = echoed
        .as_deref()
        .and_then(ChallengeType::from_provider_str)
        .unwrap_or(requested);
    ChallengeRef {
        challenge_id,
        challenge_type,
    }
}

/// The artifact always records `challenge`, the challenge actually submitted.
pub fn liveness(
    resp: LivenessResponse,
    challenge: &ChallengeRef,
) -> Result<LivenessArtifact, VerificationError> {
    let (status, confidence, deepfake) = match resp {
        LivenessResponse::Current(v2) => {
            let deepfake = match v2.deepfake {
                Some(d) => {
                    let score = unit_interval(d.score, "deepfake.score")?;
                    Some(DeepfakeSignal {
                        score,
                        detected: d.detected.unwrap_or(score >= DEEPFAKE_THRESHOLD),
                    })
                }
                None => None,
            };
            (
                liveness_status(&v2.liveness.status),
                unit_interval(v2.liveness.score, "liveness.score")?,
                deepfake,
            )
        }
        LivenessResponse::Legacy(v1) => {
            let status = match v1.is_live {
                Some(true) => LivenessStatus::Live,
                Some(false) => LivenessStatus::Spoof,
                None => LivenessStatus::Unknown,
            };
            let deepfake = match v1.deepfake_score {
                Some(raw) => {
                    let score = percent(raw, "deepfake_score")?;
                    Some(DeepfakeSignal {
                        score,
                        detected: score >= DEEPFAKE_THRESHOLD,
                    })
                }
                None => None,
            };
            (status, percent(v1.confidence, "confidence")?, deepfake)
        }
    };
    Ok(LivenessArtifact {
        challenge_id: challenge.challenge_id.clone(),
        challenge_type: challenge.challenge_type,
        confidence,
        status,
        deepfake,
        evaluated_at: Utc::now(),
    })
}

pub fn selfie(resp: SelfieResponse) -> SelfieRef {
    let selfie_id = match resp {
        SelfieResponse::Current { selfie } => selfie.id,
        SelfieResponse::Legacy { selfie_id } => selfie_id,
    };
    SelfieRef {
        selfie_id,
        uploaded_at: Utc::now(),
    }
}

pub fn selfie_image(resp: SelfieImageResponse) -> Result<ImageData, VerificationError> {
    let encoded = match resp {
        SelfieImageResponse::Current { selfie } => selfie.image.ok_or_else(|| {
            VerificationError::NormalizationFailure("selfie response carries no image".into())
        })?,
        SelfieImageResponse::Legacy { image } => image,
    };
    ImageData::from_base64(&encoded).map_err(|e| {
        VerificationError::NormalizationFailure(format!("selfie image is not decodable: {e}"))
    })
}
