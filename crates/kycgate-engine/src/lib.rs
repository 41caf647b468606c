//! kycgate Engine: Sequences verification stages against the provider and
//! tracks per-subject workflow state.
//!
//! - `WorkflowStore`: key-value persistence for workflow records
//! - `WorkflowTracker`: per-subject state plus per-subject locks
//! - `OrchestrationEngine`: the public workflow operations

pub mod engine;
pub mod report;
pub mod store;
pub mod tracker;

pub use engine::{LivenessSubmission, OrchestrationEngine};
pub use report::{DeletionOutcome, StatusReport, TerminationReport};
pub use store::{InMemoryWorkflowStore, WorkflowRecord, WorkflowStore};
pub use tracker::WorkflowTracker;
