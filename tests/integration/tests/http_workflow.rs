//! Integration test: the orchestration engine over the HTTP provider adapter.
//!
//! A wiremock server plays the verification provider; the engine is built
//! through `build_provider` exactly as the node builds it.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kycgate_core::{
    ChallengeType, DocumentStatus, Environment, ErrorKind, FaceReference, LivenessStatus,
    MaskCheck, MatchStatus, OverallStatus, SubjectId, WorkflowPhase,
};
use kycgate_integration_tests::{
    http_engine, image, liveness, mount_happy_path, mount_post, passport,
};

const SUBJECT: &str = "cus_http_1";

#[tokio::test]
async fn test_complete_workflow_over_http() {
    let server = MockServer::start().await;
    mount_happy_path(&server, SUBJECT).await;
    let engine = http_engine(&server, Environment::Development).unwrap();
    assert_eq!(engine.provider_id(), "http");

    let subject = engine.start(Some("crm-5".into())).await.unwrap();
    assert_eq!(subject.id, SubjectId::new(SUBJECT).unwrap());

    let document = engine.verify_document(&subject.id, passport()).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Verified);
    assert_eq!(document.issuing_country.as_deref(), Some("BR"));

    let live = engine.evaluate_liveness(&subject.id, liveness()).await.unwrap();
    assert_eq!(live.status, LivenessStatus::Live);
    assert_eq!(live.challenge_id, "chl_1");
    assert_eq!(live.challenge_type, ChallengeType::Passive);

    let face = engine.detect_face(&subject.id, image()).await.unwrap();
    assert_eq!(face.face_id, "face_1");
    assert!(matches!(face.mask, MaskCheck::Measured { .. }));

    let reference = FaceReference::Template(document.portrait_template.unwrap());
    let similarity = engine
        .compare_faces(&subject.id, &face.face_id, reference)
        .await
        .unwrap();
    assert_eq!(similarity.status, MatchStatus::Matched);

    let report = engine.status(&subject.id).await.unwrap();
    assert_eq!(report.overall_status, OverallStatus::Completed);
    assert_eq!(report.phase, WorkflowPhase::Completed);
}

#[tokio::test]
async fn test_liveness_uses_supplied_challenge_without_creating_one() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "/v1/customers",
        201,
        json!({"customer": {"id": SUBJECT}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/customers/{SUBJECT}/liveness")))
        .and(body_partial_json(json!({"challenge_id": "chl_existing"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"is_live": true, "confidence": 88.0})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/customers/{SUBJECT}/liveness/challenges")))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let engine = http_engine(&server, Environment::Development).unwrap();
    let subject = engine.start(None).await.unwrap();

    let mut submission = liveness();
    submission.challenge_id = Some("chl_existing".into());
    submission.challenge_type = Some(ChallengeType::Blink);
    let live = engine.evaluate_liveness(&subject.id, submission).await.unwrap();

    assert_eq!(live.challenge_id, "chl_existing");
    assert_eq!(live.challenge_type, ChallengeType::Blink);
    assert_eq!(live.status, LivenessStatus::Live);
    assert!((live.confidence - 0.88).abs() < 1e-9);
}

#[tokio::test]
async fn test_legacy_compare_score_below_threshold_is_not_matched() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "/v1/customers",
        201,
        json!({"customer_id": SUBJECT, "created": 1_767_225_600}),
    )
    .await;
    mount_post(
        &server,
        "/v1/faces/detect",
        200,
        json!({"faces_found": 1, "face": {"id": "face_9", "confidence": 97.0}}),
    )
    .await;
    mount_post(
        &server,
        "/v1/faces/face_9/mask",
        200,
        json!({"mask_probability": 0.05}),
    )
    .await;
    mount_post(&server, "/v1/faces/compare", 200, json!({"score": 74.0})).await;

    let engine = http_engine(&server, Environment::Development).unwrap();
    let subject = engine.start(None).await.unwrap();
    let face = engine.detect_face(&subject.id, image()).await.unwrap();
    let similarity = engine
        .compare_faces(
            &subject.id,
            &face.face_id,
            FaceReference::ImageUrl("https://cdn.example/id-photo.jpg".into()),
        )
        .await
        .unwrap();

    assert!((similarity.similarity - 0.74).abs() < 1e-9);
    assert_eq!(similarity.status, MatchStatus::NotMatched);
    let report = engine.status(&subject.id).await.unwrap();
    assert_eq!(report.overall_status, OverallStatus::InProgress);
    assert_eq!(report.phase, WorkflowPhase::FaceCompared);
}

#[tokio::test]
async fn test_mask_failure_is_recorded_and_redacted_in_production() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "/v1/customers",
        201,
        json!({"customer": {"id": SUBJECT}}),
    )
    .await;
    mount_post(
        &server,
        "/v1/faces/detect",
        200,
        json!({"faces": [{"face_id": "face_1", "score": 0.9}]}),
    )
    .await;
    mount_post(
        &server,
        "/v1/faces/face_1/mask",
        500,
        json!({"error": {"code": "internal", "message": "mask model shard 7 crashed"}}),
    )
    .await;

    // Production requires https, so the adapter is validated as development
    // and only the engine redacts as production would.
    let engine = http_engine(&server, Environment::Development)
        .unwrap()
        .with_verbose_errors(false);
    let subject = engine.start(None).await.unwrap();
    let face = engine.detect_face(&subject.id, image()).await.unwrap();

    match &face.mask {
        MaskCheck::Unavailable { reason } => assert!(!reason.contains("shard 7")),
        other => panic!("expected unavailable mask check, got {other:?}"),
    }
    assert!(face.confidence_reduced());
    assert!(face.confidence < face.detection_score);
    assert!(engine.status(&subject.id).await.unwrap().artifacts.face.is_some());
}

#[tokio::test]
async fn test_provider_timeout_leaves_state_untouched() {
    let server = MockServer::start().await;
    mount_happy_path(&server, SUBJECT).await;
    let engine = http_engine(&server, Environment::Development).unwrap();
    let subject = engine.start(None).await.unwrap();
    engine.verify_document(&subject.id, passport()).await.unwrap();

    // Takes priority over the happy-path document mock.
    Mock::given(method("POST"))
        .and(path(format!("/v1/customers/{SUBJECT}/documents")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(4))
                .set_body_json(json!({"result": "REJECTED", "confidence": 99.0})),
        )
        .with_priority(1)
        .mount(&server)
        .await;

    let err = engine
        .verify_document(&subject.id, passport())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderTimeout);

    let report = engine.status(&subject.id).await.unwrap();
    assert_eq!(
        report.artifacts.document.map(|d| d.status),
        Some(DocumentStatus::Verified)
    );
}

#[tokio::test]
async fn test_unknown_subject_never_reaches_provider() {
    let server = MockServer::start().await;
    let engine = http_engine(&server, Environment::Development).unwrap();
    let ghost = SubjectId::new("cus_ghost").unwrap();

    let err = engine.detect_face(&ghost, image()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSubject);
    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}
