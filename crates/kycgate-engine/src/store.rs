use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use kycgate_core::{SubjectId, VerificationSubject, WorkflowState};

/// Everything stored for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub subject: VerificationSubject,
    pub state: WorkflowState,
    /// Set by termination. A deleted record is a tombstone: it carries no
    /// artifacts and rejects every further operation.
    pub deleted: bool,
}

impl WorkflowRecord {
    pub fn new(subject: VerificationSubject) -> Self {
        Self {
            subject,
            state: WorkflowState::default(),
            deleted: false,
        }
    }
}

/// Key-value persistence for workflow records, keyed by subject id.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get(&self, id: &SubjectId) -> Option<WorkflowRecord>;

    async fn put(&self, record: WorkflowRecord);

    async fn remove(&self, id: &SubjectId) -> Option<WorkflowRecord>;

    /// Drop expired records and return how many were removed.
    async fn purge_expired(&self) -> usize;

    async fn len(&self) -> usize;
}

#[derive(Debug)]
struct Entry {
    record: WorkflowRecord,
    written_at: Instant,
}

/// How long a termination tombstone is kept when no shorter TTL applies.
pub const DEFAULT_TOMBSTONE_TTL: Duration = Duration::from_secs(24 * 3600);

/// DashMap-backed store. With a TTL, records expire that long after their
/// last write; expired records read as absent until purged. Tombstones
/// always expire, after the shorter of the TTL and the tombstone TTL.
#[derive(Debug)]
pub struct InMemoryWorkflowStore {
    records: DashMap<SubjectId, Entry>,
    ttl: Option<Duration>,
    tombstone_ttl: Duration,
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            ttl: None,
            tombstone_ttl: DEFAULT_TOMBSTONE_TTL,
        }
    }
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    pub fn with_tombstone_ttl(mut self, tombstone_ttl: Duration) -> Self {
        self.tombstone_ttl = tombstone_ttl;
        self
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        let limit = if entry.record.deleted {
            Some(self.ttl.map_or(self.tombstone_ttl, |ttl| ttl.min(self.tombstone_ttl)))
        } else {
            self.ttl
        };
        limit.is_some_and(|limit| entry.written_at.elapsed() >= limit)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get(&self, id: &SubjectId) -> Option<WorkflowRecord> {
        self.records
            .get(id)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.record.clone())
    }

    async fn put(&self, record: WorkflowRecord) {
        self.records.insert(
            record.subject.id.clone(),
            Entry {
                record,
                written_at: Instant::now(),
            },
        );
    }

    async fn remove(&self, id: &SubjectId) -> Option<WorkflowRecord> {
        self.records.remove(id).map(|(_, entry)| entry.record)
    }

    async fn purge_expired(&self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, entry| !self.is_expired(entry));
        before.saturating_sub(self.records.len())
    }

    async fn len(&self) -> usize {
        self.records.len()
    }
}
