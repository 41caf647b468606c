//! Shared node state for HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use kycgate_core::{Environment, VerificationError};
use kycgate_engine::OrchestrationEngine;

use crate::api::ApiError;

/// Request body limit when none is configured.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// State shared by every request handler.
pub struct NodeState {
    pub engine: Arc<OrchestrationEngine>,
    pub environment: Environment,
    pub max_body_bytes: usize,
    /// When the node started.
    pub start_time: Instant,
}

impl NodeState {
    pub fn new(engine: Arc<OrchestrationEngine>, environment: Environment) -> Self {
        Self {
            engine,
            environment,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            start_time: Instant::now(),
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Wrap an engine error for the response, redacting per environment.
    pub fn api_error(&self, error: VerificationError) -> ApiError {
        ApiError::new(error, self.environment.verbose_errors())
    }
}
