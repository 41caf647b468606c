//! Fixtures shared by the cross-crate scenarios in `tests/`.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kycgate_core::{
    ConfigError, DocumentType, EngineConfig, Environment, ImageData, ProviderConfig,
    ProviderCredentials, ProviderMode, Secret,
};
use kycgate_engine::{InMemoryWorkflowStore, LivenessSubmission, OrchestrationEngine};
use kycgate_provider::{build_provider, DocumentSubmission, SandboxProvider};

pub const TOKEN: &str = "integration-token";

/// Engine over a sandbox provider the test keeps a handle to.
pub fn sandbox_engine(environment: Environment) -> (SandboxProvider, OrchestrationEngine) {
    let provider = SandboxProvider::new();
    let engine = OrchestrationEngine::new(
        Arc::new(provider.clone()),
        Arc::new(InMemoryWorkflowStore::new()),
        EngineConfig::default(),
    )
    .with_verbose_errors(environment.verbose_errors());
    (provider, engine)
}

/// Provider config pointing the HTTP adapter at a mock server.
pub fn http_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        mode: ProviderMode::Http,
        base_url: server.uri(),
        credentials: ProviderCredentials::Bearer {
            token: Secret::new(TOKEN),
        },
        timeout_secs: 2,
        ..Default::default()
    }
}

/// Engine over the HTTP adapter, built the way the node builds it.
pub fn http_engine(
    server: &MockServer,
    environment: Environment,
) -> Result<OrchestrationEngine, ConfigError> {
    let provider = build_provider(&http_config(server), environment)?;
    Ok(OrchestrationEngine::new(
        provider,
        Arc::new(InMemoryWorkflowStore::new()),
        EngineConfig::default(),
    )
    .with_verbose_errors(environment.verbose_errors()))
}

pub fn image() -> ImageData {
    ImageData::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

pub fn passport() -> DocumentSubmission {
    DocumentSubmission {
        front_image: image(),
        back_image: None,
        document_type: Some(DocumentType::Passport),
    }
}

pub fn liveness() -> LivenessSubmission {
    LivenessSubmission {
        image: image(),
        challenge_id: None,
        challenge_type: None,
        options: None,
    }
}

/// Mount an authenticated POST endpoint answering with `body`.
pub async fn mount_post(server: &MockServer, route: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount the current-schema responses for a complete, positive workflow of
/// subject `subject_id`.
pub async fn mount_happy_path(server: &MockServer, subject_id: &str) {
    let customer = format!("/v1/customers/{subject_id}");
    mount_post(
        server,
        "/v1/customers",
        201,
        json!({"customer": {"id": subject_id, "created_at": "2026-03-01T10:00:00Z"}}),
    )
    .await;
    mount_post(
        server,
        &format!("{customer}/documents"),
        200,
        json!({
            "document": {
                "type": "PASSPORT",
                "country": "BR",
                "number": "X1234567",
                "expiry_date": "2031-05-30",
                "portrait_template": "tpl_portrait"
            },
            "verification": {"status": "VERIFIED", "score": 0.96}
        }),
    )
    .await;
    mount_post(
        server,
        &format!("{customer}/liveness/challenges"),
        201,
        json!({"challenge": {"id": "chl_1", "type": "PASSIVE"}}),
    )
    .await;
    mount_post(
        server,
        &format!("{customer}/liveness"),
        200,
        json!({"liveness": {"status": "LIVE", "score": 0.94}}),
    )
    .await;
    mount_post(
        server,
        "/v1/faces/detect",
        200,
        json!({"faces": [{"face_id": "face_1", "score": 0.99}]}),
    )
    .await;
    mount_post(
        server,
        "/v1/faces/face_1/mask",
        200,
        json!({"mask": {"score": 0.01}}),
    )
    .await;
    mount_post(
        server,
        "/v1/faces/compare",
        200,
        json!({"similarity": 0.91}),
    )
    .await;
}
