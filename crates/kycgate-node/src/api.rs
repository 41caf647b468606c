//! HTTP API server for the kycgate node.
//!
//! Every response, success or failure, is wrapped in the same envelope:
//! `{ "success": bool, "data"?: ..., "message"?: string, "error"?: kind }`.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        DefaultBodyLimit, Path, Request, State,
    },
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::Instrument;

use kycgate_core::{
    ChallengeRef, ChallengeType, DocumentArtifact, DocumentType, ErrorKind, FaceArtifact,
    FaceReference, ImageData, LivenessArtifact, LivenessOptions, SelfieRef, SimilarityArtifact,
    SubjectId, VerificationError, VerificationSubject,
};
use kycgate_engine::{LivenessSubmission, StatusReport, TerminationReport};
use kycgate_provider::DocumentSubmission;

use crate::state::NodeState;

// --- Envelope ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        })
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// An engine error on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    error: VerificationError,
    verbose: bool,
    status: StatusCode,
}

impl ApiError {
    pub fn new(error: VerificationError, verbose: bool) -> Self {
        let status = status_for(error.kind());
        Self {
            error,
            verbose,
            status,
        }
    }

    /// Override the status derived from the error kind.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnknownSubject => StatusCode::NOT_FOUND,
        ErrorKind::PreconditionFailed => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ProviderRejected => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ProviderUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::NormalizationFailure => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.error.kind();
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            message: Some(self.error.public_message(self.verbose)),
            error: Some(kind),
        };
        (self.status, Json(body)).into_response()
    }
}

// --- Request types ---

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    /// Base64 image.
    pub front_image: String,
    #[serde(default)]
    pub back_image: Option<String>,
    #[serde(default)]
    pub document_type: Option<DocumentType>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub challenge_type: Option<ChallengeType>,
    #[serde(default)]
    pub deepfake_check: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LivenessRequest {
    /// Base64 image.
    pub image: String,
    #[serde(default)]
    pub challenge_id: Option<String>,
    #[serde(default)]
    pub challenge_type: Option<ChallengeType>,
    #[serde(default)]
    pub deepfake_check: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    /// Base64 image.
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub probe_face_id: String,
    #[serde(default)]
    pub reference_image_url: Option<String>,
    #[serde(default)]
    pub reference_template: Option<String>,
}

// --- Response types ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelfieImageResponse {
    /// Base64 image.
    pub image: String,
}

// --- Validation ---

fn subject_id(state: &NodeState, raw: String) -> Result<SubjectId, ApiError> {
    SubjectId::new(raw).map_err(|e| state.api_error(e))
}

/// A malformed body is `invalid_input`; one over the size limit keeps the
/// kind but answers 413.
fn rejected_body(state: &NodeState, status: StatusCode, text: String) -> ApiError {
    let error = state.api_error(VerificationError::invalid_input(text));
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        error.with_status(status)
    } else {
        error
    }
}

fn json_body<T>(state: &NodeState, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| rejected_body(state, rejection.status(), rejection.body_text()))
}

fn image(state: &NodeState, field: &str, encoded: &str) -> Result<ImageData, ApiError> {
    ImageData::from_base64(encoded).map_err(|e| {
        state.api_error(VerificationError::invalid_input(format!("{field}: {e}")))
    })
}

fn liveness_options(deepfake_check: Option<bool>) -> Option<LivenessOptions> {
    deepfake_check.map(|deepfake_check| LivenessOptions { deepfake_check })
}

// --- Handlers ---

async fn handle_health(State(state): State<Arc<NodeState>>) -> Json<ApiResponse<HealthResponse>> {
    ApiResponse::ok(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.engine.provider_id().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn handle_start(
    State(state): State<Arc<NodeState>>,
    raw: Result<Bytes, BytesRejection>,
) -> ApiResult<VerificationSubject> {
    let raw = raw.map_err(|rejection| {
        rejected_body(&state, rejection.status(), rejection.body_text())
    })?;
    // An empty body is allowed; there is nothing mandatory to send.
    let req: StartRequest = if raw.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&raw).map_err(|e| {
            state.api_error(VerificationError::invalid_input(format!(
                "invalid request body: {e}"
            )))
        })?
    };
    let subject = state
        .engine
        .start(req.correlation_id)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(subject))
}

async fn handle_document(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> ApiResult<DocumentArtifact> {
    let id = subject_id(&state, id)?;
    let req = json_body(&state, payload)?;
    let submission = DocumentSubmission {
        front_image: image(&state, "front_image", &req.front_image)?,
        back_image: req
            .back_image
            .as_deref()
            .map(|b| image(&state, "back_image", b))
            .transpose()?,
        document_type: req.document_type,
    };
    let artifact = state
        .engine
        .verify_document(&id, submission)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(artifact))
}

async fn handle_challenge(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> ApiResult<ChallengeRef> {
    let id = subject_id(&state, id)?;
    let req = json_body(&state, payload)?;
    let challenge = state
        .engine
        .create_liveness_challenge(&id, req.challenge_type, liveness_options(req.deepfake_check))
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(challenge))
}

async fn handle_liveness(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
    payload: Result<Json<LivenessRequest>, JsonRejection>,
) -> ApiResult<LivenessArtifact> {
    let id = subject_id(&state, id)?;
    let req = json_body(&state, payload)?;
    let submission = LivenessSubmission {
        image: image(&state, "image", &req.image)?,
        challenge_id: req.challenge_id.filter(|c| !c.trim().is_empty()),
        challenge_type: req.challenge_type,
        options: liveness_options(req.deepfake_check),
    };
    let artifact = state
        .engine
        .evaluate_liveness(&id, submission)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(artifact))
}

async fn handle_detect_face(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> ApiResult<FaceArtifact> {
    let id = subject_id(&state, id)?;
    let req = json_body(&state, payload)?;
    let image = image(&state, "image", &req.image)?;
    let artifact = state
        .engine
        .detect_face(&id, image)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(artifact))
}

async fn handle_compare_faces(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> ApiResult<SimilarityArtifact> {
    let id = subject_id(&state, id)?;
    let req = json_body(&state, payload)?;
    if req.probe_face_id.trim().is_empty() {
        return Err(state.api_error(VerificationError::invalid_input(
            "probe_face_id must not be empty",
        )));
    }
    let reference = FaceReference::from_parts(req.reference_image_url, req.reference_template)
        .map_err(|e| state.api_error(e))?;
    let artifact = state
        .engine
        .compare_faces(&id, &req.probe_face_id, reference)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(artifact))
}

async fn handle_upload_selfie(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> ApiResult<SelfieRef> {
    let id = subject_id(&state, id)?;
    let req = json_body(&state, payload)?;
    let image = image(&state, "image", &req.image)?;
    let selfie = state
        .engine
        .upload_selfie(&id, image)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(selfie))
}

async fn handle_fetch_selfie(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
) -> ApiResult<SelfieImageResponse> {
    let id = subject_id(&state, id)?;
    let image = state
        .engine
        .fetch_selfie(&id)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(SelfieImageResponse {
        image: image.to_base64(),
    }))
}

async fn handle_status(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusReport> {
    let id = subject_id(&state, id)?;
    let report = state
        .engine
        .status(&id)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::ok(report))
}

async fn handle_terminate(
    State(state): State<Arc<NodeState>>,
    Path(id): Path<String>,
) -> ApiResult<TerminationReport> {
    let id = subject_id(&state, id)?;
    let report = state
        .engine
        .terminate(&id)
        .await
        .map_err(|e| state.api_error(e))?;
    let message = report.message.clone();
    let mut response = ApiResponse::ok(report);
    response.message = Some(message);
    Ok(response)
}

/// Tag each request with a v7 request id: a tracing span and a response header.
async fn request_id(req: Request, next: Next) -> Response {
    let id = uuid::Uuid::now_v7();
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );
    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/subjects", post(handle_start))
        .route("/api/v1/subjects/{id}", delete(handle_terminate))
        .route("/api/v1/subjects/{id}/documents", post(handle_document))
        .route(
            "/api/v1/subjects/{id}/liveness/challenges",
            post(handle_challenge),
        )
        .route("/api/v1/subjects/{id}/liveness", post(handle_liveness))
        .route("/api/v1/subjects/{id}/faces/detect", post(handle_detect_face))
        .route(
            "/api/v1/subjects/{id}/faces/compare",
            post(handle_compare_faces),
        )
        .route(
            "/api/v1/subjects/{id}/selfie",
            put(handle_upload_selfie).get(handle_fetch_selfie),
        )
        .route("/api/v1/subjects/{id}/status", get(handle_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<NodeState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request as HttpRequest};
    use kycgate_core::{EngineConfig, Environment};
    use kycgate_engine::{InMemoryWorkflowStore, OrchestrationEngine};
    use kycgate_provider::{ProviderOp, SandboxProvider};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const IMAGE_B64: &str = "/9j/4AAQ";

    fn app_with(environment: Environment) -> (SandboxProvider, Router) {
        app_limited(environment, crate::state::DEFAULT_MAX_BODY_BYTES)
    }

    fn app_limited(environment: Environment, max_body_bytes: usize) -> (SandboxProvider, Router) {
        let provider = SandboxProvider::new();
        let engine = OrchestrationEngine::new(
            Arc::new(provider.clone()),
            Arc::new(InMemoryWorkflowStore::new()),
            EngineConfig::default(),
        )
        .with_verbose_errors(environment.verbose_errors());
        let state = Arc::new(
            NodeState::new(Arc::new(engine), environment).with_max_body_bytes(max_body_bytes),
        );
        (provider, build_router(state))
    }

    fn app() -> (SandboxProvider, Router) {
        app_with(Environment::Development)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = HttpRequest::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn start(app: &Router) -> String {
        let (status, body) = send(app, Method::POST, "/api/v1/subjects", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (_, app) = app();
        let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["provider"], "sandbox");
    }

    #[tokio::test]
    async fn test_request_id_header() {
        let (_, app) = app();
        let request = HttpRequest::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_start_accepts_empty_body() {
        let (_, app) = app();
        let (status, body) = send(&app, Method::POST, "/api/v1/subjects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["onboarding_status"], "in_progress");
    }

    #[tokio::test]
    async fn test_unknown_subject_is_404() {
        let (_, app) = app();
        let (status, body) =
            send(&app, Method::GET, "/api/v1/subjects/cus_nope/status", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "unknown_subject");
    }

    #[tokio::test]
    async fn test_invalid_base64_is_400_without_provider_call() {
        let (provider, app) = app();
        let id = start(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/subjects/{id}/documents"),
            Some(json!({"front_image": "%%% not base64 %%%"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
        assert!(body["message"].as_str().unwrap().contains("front_image"));
        assert_eq!(provider.call_count(ProviderOp::SubmitDocument), 0);
    }

    /// A document body whose serialized length is exactly `len` bytes.
    fn document_body_of_len(len: usize) -> Value {
        let empty = json!({"front_image": ""}).to_string().len();
        // Base64 of n zero bytes is n / 3 * 4 characters of "A".
        let image_len = (len - empty) / 4 * 4;
        let padding = len - empty - image_len;
        let image = format!("{}{}", "A".repeat(image_len), " ".repeat(padding));
        let body = json!({ "front_image": image });
        assert_eq!(body.to_string().len(), len);
        body
    }

    #[tokio::test]
    async fn test_body_limit_accepts_under_and_rejects_over_with_413() {
        let (provider, app) = app_limited(Environment::Development, 4096);
        let id = start(&app).await;
        let uri = format!("/api/v1/subjects/{id}/documents");

        let (status, body) =
            send(&app, Method::POST, &uri, Some(document_body_of_len(4000))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(provider.call_count(ProviderOp::SubmitDocument), 1);

        let (status, body) =
            send(&app, Method::POST, &uri, Some(document_body_of_len(4200))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "invalid_input");
        assert_eq!(provider.call_count(ProviderOp::SubmitDocument), 1);
    }

    #[tokio::test]
    async fn test_default_body_limit_fits_document_photos() {
        let (provider, app) = app();
        let id = start(&app).await;
        // Two 1.7 MB photos, front and back.
        let photo = "A".repeat(1_700_000 / 3 * 4);
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/subjects/{id}/documents"),
            Some(json!({"front_image": photo, "back_image": photo})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(provider.call_count(ProviderOp::SubmitDocument), 1);
    }

    #[tokio::test]
    async fn test_oversized_start_body_is_413() {
        let (_, app) = app_limited(Environment::Development, 64);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/subjects",
            Some(json!({"correlation_id": "x".repeat(128)})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_unknown_document_type_is_400() {
        let (_, app) = app();
        let id = start(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/subjects/{id}/documents"),
            Some(json!({"front_image": IMAGE_B64, "document_type": "library_card"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_compare_reference_must_be_exactly_one() {
        let (_, app) = app();
        let id = start(&app).await;
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/subjects/{id}/faces/compare"),
            Some(json!({
                "probe_face_id": "face_1",
                "reference_image_url": "https://cdn.example/a.jpg",
                "reference_template": "tpl"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_compare_before_detect_is_409() {
        let (_, app) = app();
        let id = start(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/subjects/{id}/faces/compare"),
            Some(json!({"probe_face_id": "face_1", "reference_template": "tpl"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "precondition_failed");
    }

    #[tokio::test]
    async fn test_provider_errors_map_to_gateway_statuses() {
        let (provider, app) = app();
        let id = start(&app).await;
        let uri = format!("/api/v1/subjects/{id}/faces/detect");
        let image = Some(json!({"image": IMAGE_B64}));

        provider.fail_once(
            ProviderOp::DetectFace,
            VerificationError::ProviderUnavailable("down".into()),
        );
        let (status, _) = send(&app, Method::POST, &uri, image.clone()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        provider.fail_once(
            ProviderOp::DetectFace,
            VerificationError::ProviderTimeout {
                operation: "detect_face".into(),
                timeout_secs: 60,
            },
        );
        let (status, body) = send(&app, Method::POST, &uri, image.clone()).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "provider_timeout");

        provider.fail_once(
            ProviderOp::DetectFace,
            VerificationError::ProviderRejected {
                status: 403,
                code: None,
                message: "forbidden".into(),
            },
        );
        let (status, _) = send(&app, Method::POST, &uri, image.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        provider.fail_once(
            ProviderOp::DetectFace,
            VerificationError::NormalizationFailure("shape".into()),
        );
        let (status, _) = send(&app, Method::POST, &uri, image).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_production_redacts_provider_payload() {
        let (provider, app) = app_with(Environment::Production);
        let id = start(&app).await;
        provider.fail_once(
            ProviderOp::SubmitDocument,
            VerificationError::ProviderRejected {
                status: 403,
                code: Some("tenant_locked".into()),
                message: "tenant acme-77 locked by compliance".into(),
            },
        );
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/subjects/{id}/documents"),
            Some(json!({"front_image": IMAGE_B64})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!body["message"].as_str().unwrap().contains("acme-77"));
    }

    #[tokio::test]
    async fn test_full_flow_over_http() {
        let (_, app) = app();
        let id = start(&app).await;
        let base = format!("/api/v1/subjects/{id}");

        let (status, doc) = send(
            &app,
            Method::POST,
            &format!("{base}/documents"),
            Some(json!({"front_image": IMAGE_B64, "document_type": "passport"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let template = doc["data"]["portrait_template"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("{base}/liveness"),
            Some(json!({"image": IMAGE_B64, "deepfake_check": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, face) = send(
            &app,
            Method::POST,
            &format!("{base}/faces/detect"),
            Some(json!({"image": IMAGE_B64})),
        )
        .await;
        let face_id = face["data"]["face_id"].as_str().unwrap().to_string();

        let (status, cmp) = send(
            &app,
            Method::POST,
            &format!("{base}/faces/compare"),
            Some(json!({"probe_face_id": face_id, "reference_template": template})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cmp["data"]["status"], "matched");

        let (_, status_body) = send(&app, Method::GET, &format!("{base}/status"), None).await;
        assert_eq!(status_body["data"]["overall_status"], "completed");
        assert_eq!(status_body["data"]["phase"], "completed");

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("{base}/selfie"),
            Some(json!({"image": IMAGE_B64})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, selfie) = send(&app, Method::GET, &format!("{base}/selfie"), None).await;
        assert_eq!(selfie["data"]["image"], IMAGE_B64);

        let (status, term) = send(&app, Method::DELETE, &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(term["data"]["selfie"]["outcome"], "deleted");
        assert!(term["message"].is_string());

        let (status, _) = send(&app, Method::GET, &format!("{base}/status"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
