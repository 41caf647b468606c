use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use kycgate_core::{
    ChallengeRef, OnboardingStatus, OverallStatus, SelfieRef, StageArtifact, SubjectId,
    VerificationError, VerificationSubject, WorkflowState,
};

use crate::store::{WorkflowRecord, WorkflowStore};

/// Per-subject workflow state and locks.
///
/// Stage executions for one subject are serialized through `lock`; distinct
/// subjects never contend. Callers hold the guard for the whole stage,
/// including the provider call.
pub struct WorkflowTracker {
    store: Arc<dyn WorkflowStore>,
    locks: DashMap<SubjectId, Arc<Mutex<()>>>,
}

impl WorkflowTracker {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Acquire the subject's lock, waiting behind any running stage.
    pub async fn lock(&self, id: &SubjectId) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(id.clone()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drop lock entries nobody holds or waits on. Returns how many went.
    pub fn prune_idle_locks(&self) -> usize {
        let before = self.locks.len();
        // Every guard and waiter keeps its own Arc, so a count of one means
        // only the map references the mutex.
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub async fn purge_expired(&self) -> usize {
        self.store.purge_expired().await
    }

    /// Start tracking a freshly created subject with an empty state.
    pub async fn register(&self, subject: VerificationSubject) {
        tracing::debug!(subject_id = %subject.id, "workflow registered");
        self.store.put(WorkflowRecord::new(subject)).await;
    }

    async fn live_record(&self, id: &SubjectId) -> Result<WorkflowRecord, VerificationError> {
        match self.store.get(id).await {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(VerificationError::UnknownSubject(id.to_string())),
        }
    }

    /// The subject record. Unknown and deleted subjects are `UnknownSubject`.
    pub async fn subject(&self, id: &SubjectId) -> Result<VerificationSubject, VerificationError> {
        self.live_record(id).await.map(|record| record.subject)
    }

    /// Current state; empty for unknown or deleted subjects.
    pub async fn get(&self, id: &SubjectId) -> WorkflowState {
        match self.store.get(id).await {
            Some(record) if !record.deleted => record.state,
            _ => WorkflowState::default(),
        }
    }

    /// Record a stage artifact and resync the onboarding status.
    pub async fn record_stage(
        &self,
        id: &SubjectId,
        artifact: StageArtifact,
    ) -> Result<WorkflowRecord, VerificationError> {
        let mut record = self.live_record(id).await?;
        record.state.record(artifact);
        record.subject.onboarding_status = match record.state.overall_status() {
            OverallStatus::Completed => OnboardingStatus::Finished,
            OverallStatus::InProgress => OnboardingStatus::InProgress,
        };
        self.store.put(record.clone()).await;
        Ok(record)
    }

    pub async fn record_selfie(
        &self,
        id: &SubjectId,
        selfie: SelfieRef,
    ) -> Result<(), VerificationError> {
        let mut record = self.live_record(id).await?;
        record.state.record_selfie(selfie);
        self.store.put(record).await;
        Ok(())
    }

    pub async fn record_challenge(
        &self,
        id: &SubjectId,
        challenge: ChallengeRef,
    ) -> Result<(), VerificationError> {
        let mut record = self.live_record(id).await?;
        record.state.record_challenge(challenge);
        self.store.put(record).await;
        Ok(())
    }

    /// Drop all artifacts and leave a tombstone.
    pub async fn clear(&self, id: &SubjectId) {
        match self.store.get(id).await {
            Some(mut record) => {
                record.state = WorkflowState::default();
                record.deleted = true;
                self.store.put(record).await;
            }
            None => {
                self.store.remove(id).await;
            }
        }
        tracing::debug!(subject_id = %id, "workflow cleared");
    }
}
