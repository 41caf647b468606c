//! HTTPS REST adapter for the external verification provider.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use kycgate_core::{
    ChallengeRef, ChallengeType, ConfigError, DocumentArtifact, Environment, FaceReference,
    ImageData, LivenessArtifact, LivenessOptions, ProviderConfig, SelfieRef, SubjectId,
    VerificationError,
};

use crate::auth::TokenSource;
use crate::error;
use crate::normalize;
use crate::traits::{ProviderResult, VerificationProvider};
use crate::types::{DocumentSubmission, FaceComparison, FaceDetection, MaskScore, SubjectRef};
use crate::wire::{
    ChallengeRequest, CompareRequest, CreateCustomerRequest, DocumentRequest, ImageRequest,
    LivenessRequest,
};

/// Adapter speaking the provider's REST API.
///
/// Every call carries a bearer token and, when configured, a fixed `Host`
/// header. At most `max_concurrent_requests` calls are in flight at once.
/// Calls are never retried.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    base_url: Url,
    host_header: Option<String>,
    timeout_secs: u64,
    http: Client,
    auth: TokenSource,
    permits: Arc<Semaphore>,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig, environment: Environment) -> Result<Self, ConfigError> {
        config.validate(environment)?;

        let base_url = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "provider.base_url",
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "provider.base_url",
                reason: "not a base URL".into(),
            });
        }

        if config.accept_invalid_certs {
            warn!("TLS certificate validation is disabled for the verification provider");
        }
        let http = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(concat!("kycgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "provider",
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let token_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.token_path.trim_start_matches('/')
        );
        let auth = TokenSource::new(
            config.credentials.clone(),
            token_url,
            config.host_header.clone(),
            config.timeout_secs,
            http.clone(),
        );

        Ok(Self {
            base_url,
            host_header: config.host_header.clone(),
            timeout_secs: config.timeout_secs,
            http,
            auth,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests)),
        })
    }

    fn url(&self, segments: &[&str]) -> ProviderResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| VerificationError::ProviderUnavailable("invalid provider base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue one provider call and return the raw body of a 2xx answer.
    async fn call<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ProviderResult<String> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            VerificationError::ProviderUnavailable("provider adapter is shut down".into())
        })?;

        let mut request = self.http.request(method.clone(), url);
        if let Some(host) = &self.host_header {
            request = request.header(reqwest::header::HOST, host);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let request = self.auth.apply(request).await?;

        debug!(operation, %method, "calling verification provider");
        let response = request
            .send()
            .await
            .map_err(|e| error::from_transport(operation, self.timeout_secs, &e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| error::from_transport(operation, self.timeout_secs, &e))?;

        if status.is_success() {
            return Ok(text);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.auth.invalidate().await;
        }
        let err = error::from_status(operation, status.as_u16(), &text);
        debug!(operation, status = status.as_u16(), kind = %err.kind(), "provider call failed");
        Err(err)
    }

    async fn call_json<B, T>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ProviderResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.call(operation, method, url, body).await?;
        normalize::decode(operation, &text)
    }
}

#[async_trait]
impl VerificationProvider for HttpProvider {
    async fn create_subject(&self, correlation_id: Option<&str>) -> ProviderResult<SubjectRef> {
        let url = self.url(&["v1", "customers"])?;
        let body = CreateCustomerRequest {
            external_ref: correlation_id,
        };
        let resp = self
            .call_json("create_subject", Method::POST, url, Some(&body))
            .await?;
        normalize::subject(resp)
    }

    async fn submit_document(
        &self,
        subject: &SubjectId,
        submission: &DocumentSubmission,
    ) -> ProviderResult<DocumentArtifact> {
        let url = self.url(&["v1", "customers", subject.as_str(), "documents"])?;
        let body = DocumentRequest {
            front_image: submission.front_image.to_base64(),
            back_image: submission.back_image.as_ref().map(ImageData::to_base64),
            document_type: submission.document_type.map(|t| t.as_provider_str()),
        };
        let resp = self
            .call_json("submit_document", Method::POST, url, Some(&body))
            .await?;
        normalize::document(resp)
    }

    async fn detect_face(&self, image: &ImageData) -> ProviderResult<FaceDetection> {
        let url = self.url(&["v1", "faces", "detect"])?;
        let body = ImageRequest {
            image: image.to_base64(),
        };
        let resp = self
            .call_json("detect_face", Method::POST, url, Some(&body))
            .await?;
        normalize::face_detection(resp)
    }

    async fn check_face_mask(&self, face_id: &str) -> ProviderResult<MaskScore> {
        let url = self.url(&["v1", "faces", face_id, "mask"])?;
        let resp = self
            .call_json::<(), _>("check_face_mask", Method::POST, url, None)
            .await?;
        normalize::mask(resp)
    }

    async fn compare_faces(
        &self,
        probe_face_id: &str,
        reference: &FaceReference,
    ) -> ProviderResult<FaceComparison> {
        let url = self.url(&["v1", "faces", "compare"])?;
        let (reference_image_url, reference_template) = match reference {
            FaceReference::ImageUrl(url) => (Some(url.as_str()), None),
            FaceReference::Template(template) => (None, Some(template.as_str())),
        };
        let body = CompareRequest {
            probe_face_id,
            reference_image_url,
            reference_template,
        };
        let resp = self
            .call_json("compare_faces", Method::POST, url, Some(&body))
            .await?;
        normalize::comparison(resp)
    }

    async fn create_liveness_challenge(
        &self,
        subject: &SubjectId,
        challenge_type: ChallengeType,
        options: &LivenessOptions,
    ) -> ProviderResult<ChallengeRef> {
        let url = self.url(&["v1", "customers", subject.as_str(), "liveness", "challenges"])?;
        let body = ChallengeRequest {
            challenge_type: challenge_type.as_provider_str(),
            deepfake_check: options.deepfake_check,
        };
        let resp = self
            .call_json("create_liveness_challenge", Method::POST, url, Some(&body))
            .await?;
        Ok(normalize::challenge(resp, challenge_type))
    }

    async fn submit_liveness(
        &self,
        subject: &SubjectId,
        image: &ImageData,
        challenge: &ChallengeRef,
        options: &LivenessOptions,
    ) -> ProviderResult<LivenessArtifact> {
        let url = self.url(&["v1", "customers", subject.as_str(), "liveness"])?;
        let body = LivenessRequest {
            image: image.to_base64(),
            challenge_id: &challenge.challenge_id,
            deepfake_check: options.deepfake_check,
        };
        let resp = self
            .call_json("submit_liveness", Method::POST, url, Some(&body))
            .await?;
        normalize::liveness(resp, challenge)
    }

    async fn upload_selfie(
        &self,
        subject: &SubjectId,
        image: &ImageData,
    ) -> ProviderResult<SelfieRef> {
        let url = self.url(&["v1", "customers", subject.as_str(), "selfie"])?;
        let body = ImageRequest {
            image: image.to_base64(),
        };
        let resp = self
            .call_json("upload_selfie", Method::PUT, url, Some(&body))
            .await?;
        Ok(normalize::selfie(resp))
    }

    async fn fetch_selfie(&self, subject: &SubjectId) -> ProviderResult<ImageData> {
        let url = self.url(&["v1", "customers", subject.as_str(), "selfie"])?;
        let resp = self
            .call_json::<(), _>("fetch_selfie", Method::GET, url, None)
            .await?;
        normalize::selfie_image(resp)
    }

    async fn delete_selfie(&self, subject: &SubjectId) -> ProviderResult<()> {
        let url = self.url(&["v1", "customers", subject.as_str(), "selfie"])?;
        self.call::<()>("delete_selfie", Method::DELETE, url, None)
            .await
            .map(|_| ())
    }

    async fn delete_liveness(&self, subject: &SubjectId) -> ProviderResult<()> {
        let url = self.url(&["v1", "customers", subject.as_str(), "liveness"])?;
        self.call::<()>("delete_liveness", Method::DELETE, url, None)
            .await
            .map(|_| ())
    }

    fn provider_id(&self) -> &str {
        "http"
    }
}
