//! Integration test: complete verification workflows across provider and engine.
//!
//! Runs the orchestration engine over the sandbox provider through whole
//! subject lifecycles, from start to termination.

use std::sync::Arc;
use std::time::Duration;

use kycgate_core::{
    DocumentStatus, Environment, ErrorKind, FaceReference, LivenessStatus, MatchStatus,
    OnboardingStatus, OverallStatus, Stage, VerificationError, WorkflowPhase,
};
use kycgate_engine::DeletionOutcome;
use kycgate_integration_tests::{image, liveness, passport, sandbox_engine};
use kycgate_provider::ProviderOp;

// =========================================================================
// Happy path: start → document → liveness → face → compare → terminate
// =========================================================================

#[tokio::test]
async fn test_complete_workflow_then_terminate() {
    let (provider, engine) = sandbox_engine(Environment::Development);

    let subject = engine.start(Some("order-991".into())).await.unwrap();
    assert_eq!(subject.onboarding_status, OnboardingStatus::InProgress);
    assert_eq!(subject.correlation_id.as_deref(), Some("order-991"));

    let status = engine.status(&subject.id).await.unwrap();
    assert_eq!(status.phase, WorkflowPhase::Created);
    assert!(status.completed_stages.is_empty());

    // Document
    let document = engine.verify_document(&subject.id, passport()).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Verified);
    let template = document.portrait_template.clone().unwrap();
    assert_eq!(
        engine.status(&subject.id).await.unwrap().phase,
        WorkflowPhase::DocumentSubmitted
    );

    // Liveness with an auto-created challenge
    let live = engine.evaluate_liveness(&subject.id, liveness()).await.unwrap();
    assert_eq!(live.status, LivenessStatus::Live);
    assert_eq!(provider.call_count(ProviderOp::CreateLivenessChallenge), 1);
    assert_eq!(
        engine.status(&subject.id).await.unwrap().phase,
        WorkflowPhase::LivenessSubmitted
    );

    // Face detection and comparison against the document portrait
    let face = engine.detect_face(&subject.id, image()).await.unwrap();
    let similarity = engine
        .compare_faces(&subject.id, &face.face_id, FaceReference::Template(template))
        .await
        .unwrap();
    assert_eq!(similarity.status, MatchStatus::Matched);

    let report = engine.status(&subject.id).await.unwrap();
    assert_eq!(report.overall_status, OverallStatus::Completed);
    assert_eq!(report.phase, WorkflowPhase::Completed);
    assert_eq!(report.subject.onboarding_status, OnboardingStatus::Finished);
    assert_eq!(
        report.completed_stages,
        vec![
            Stage::Document,
            Stage::Liveness,
            Stage::FaceDetection,
            Stage::FaceComparison
        ]
    );

    // Selfie round-trip
    engine.upload_selfie(&subject.id, image()).await.unwrap();
    assert_eq!(engine.fetch_selfie(&subject.id).await.unwrap(), image());

    // Terminate removes provider data and leaves an absorbing tombstone
    let termination = engine.terminate(&subject.id).await.unwrap();
    assert!(termination.success);
    assert_eq!(termination.selfie, DeletionOutcome::Deleted);
    assert_eq!(termination.liveness, DeletionOutcome::Deleted);
    assert!(!provider.has_selfie(&subject.id));
    assert!(!provider.has_liveness(&subject.id));

    let calls_before = provider.calls().len();
    let err = engine
        .verify_document(&subject.id, passport())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSubject);
    assert!(engine.status(&subject.id).await.is_err());
    assert!(engine.terminate(&subject.id).await.is_err());
    assert_eq!(provider.calls().len(), calls_before);
}

// =========================================================================
// Negative outcomes and resubmission
// =========================================================================

#[tokio::test]
async fn test_spoof_then_resubmission_recovers() {
    let (provider, engine) = sandbox_engine(Environment::Development);
    let subject = engine.start(None).await.unwrap();

    let document = engine.verify_document(&subject.id, passport()).await.unwrap();
    let template = document.portrait_template.unwrap();
    let face = engine.detect_face(&subject.id, image()).await.unwrap();
    engine
        .compare_faces(&subject.id, &face.face_id, FaceReference::Template(template))
        .await
        .unwrap();

    provider.update_outcomes(|o| o.liveness_status = LivenessStatus::Spoof);
    engine.evaluate_liveness(&subject.id, liveness()).await.unwrap();
    let report = engine.status(&subject.id).await.unwrap();
    assert_eq!(report.overall_status, OverallStatus::InProgress);
    assert_eq!(report.phase, WorkflowPhase::FaceCompared);
    assert_eq!(report.subject.onboarding_status, OnboardingStatus::InProgress);

    // A fresh liveness attempt overwrites the spoof verdict.
    provider.update_outcomes(|o| o.liveness_status = LivenessStatus::Live);
    engine.evaluate_liveness(&subject.id, liveness()).await.unwrap();
    let report = engine.status(&subject.id).await.unwrap();
    assert_eq!(report.overall_status, OverallStatus::Completed);
    assert_eq!(report.subject.onboarding_status, OnboardingStatus::Finished);

    // A rejected document flips it back.
    provider.update_outcomes(|o| o.document_status = DocumentStatus::Rejected);
    engine.verify_document(&subject.id, passport()).await.unwrap();
    let report = engine.status(&subject.id).await.unwrap();
    assert_eq!(report.overall_status, OverallStatus::InProgress);
    assert_eq!(
        report.artifacts.document.map(|d| d.status),
        Some(DocumentStatus::Rejected)
    );
}

#[tokio::test]
async fn test_compare_requires_latest_detection() {
    let (provider, engine) = sandbox_engine(Environment::Development);
    let subject = engine.start(None).await.unwrap();

    let first = engine.detect_face(&subject.id, image()).await.unwrap();
    let second = engine.detect_face(&subject.id, image()).await.unwrap();
    assert_ne!(first.face_id, second.face_id);

    let err = engine
        .compare_faces(
            &subject.id,
            &first.face_id,
            FaceReference::ImageUrl("https://cdn.example/ref.jpg".into()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(provider.call_count(ProviderOp::CompareFaces), 0);
}

// =========================================================================
// Failure handling
// =========================================================================

#[tokio::test]
async fn test_partial_terminate_still_clears_local_state() {
    let (provider, engine) = sandbox_engine(Environment::Production);
    let subject = engine.start(None).await.unwrap();
    engine.evaluate_liveness(&subject.id, liveness()).await.unwrap();
    engine.upload_selfie(&subject.id, image()).await.unwrap();

    provider.fail_once(
        ProviderOp::DeleteSelfie,
        VerificationError::ProviderUnavailable("storage cluster eu-2 unreachable".into()),
    );
    let report = engine.terminate(&subject.id).await.unwrap();

    assert!(report.success);
    assert!(report.has_failures());
    assert_eq!(report.liveness, DeletionOutcome::Deleted);
    match &report.selfie {
        DeletionOutcome::Failed { kind, message } => {
            assert_eq!(*kind, ErrorKind::ProviderUnavailable);
            assert!(!message.contains("eu-2"));
        }
        other => panic!("expected failed selfie deletion, got {other:?}"),
    }
    assert!(report.message.contains("selfie"));
    assert!(engine.status(&subject.id).await.is_err());
}

#[tokio::test]
async fn test_terminate_with_nothing_to_delete() {
    let (_, engine) = sandbox_engine(Environment::Development);
    let subject = engine.start(None).await.unwrap();

    let report = engine.terminate(&subject.id).await.unwrap();
    assert_eq!(report.selfie, DeletionOutcome::NotPresent);
    assert_eq!(report.liveness, DeletionOutcome::NotPresent);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_failed_liveness_submission_records_nothing() {
    let (provider, engine) = sandbox_engine(Environment::Development);
    let subject = engine.start(None).await.unwrap();

    provider.fail_once(
        ProviderOp::SubmitLiveness,
        VerificationError::ProviderTimeout {
            operation: "submit_liveness".into(),
            timeout_secs: 60,
        },
    );
    let err = engine
        .evaluate_liveness(&subject.id, liveness())
        .await
        .unwrap_err();
    assert!(err.kind().is_ambiguous());
    assert_eq!(provider.call_count(ProviderOp::CreateLivenessChallenge), 1);
    assert_eq!(provider.call_count(ProviderOp::SubmitLiveness), 1);

    let report = engine.status(&subject.id).await.unwrap();
    assert!(report.artifacts.liveness.is_none());
    assert!(report.artifacts.last_challenge.is_none());
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test]
async fn test_many_subjects_progress_independently() {
    let (provider, engine) = sandbox_engine(Environment::Development);
    provider.set_latency(Some(Duration::from_millis(20)));
    let engine = Arc::new(engine);

    let mut subjects = Vec::new();
    for _ in 0..4 {
        subjects.push(engine.start(None).await.unwrap().id);
    }

    let mut handles = Vec::new();
    for id in subjects.clone() {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.verify_document(&id, passport()).await.unwrap();
            engine.detect_face(&id, image()).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(provider.max_in_flight() > 1);
    for id in &subjects {
        let report = engine.status(id).await.unwrap();
        assert!(report.artifacts.document.is_some());
        assert!(report.artifacts.face.is_some());
    }
}
