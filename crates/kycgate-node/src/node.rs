//! The kycgate node.
//!
//! Builds the provider adapter, workflow store, and orchestration engine from
//! config, then runs the HTTP API and the workflow janitor as background tasks.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use kycgate_engine::{InMemoryWorkflowStore, OrchestrationEngine, WorkflowStore, WorkflowTracker};
use kycgate_provider::build_provider;

use crate::config::KycgateConfig;
use crate::state::NodeState;

pub struct KycgateNode {
    config: KycgateConfig,
    engine: Arc<OrchestrationEngine>,
    /// Shared state accessible from HTTP handlers.
    node_state: Arc<NodeState>,
    api_task: Option<JoinHandle<()>>,
    janitor_task: Option<JoinHandle<()>>,
}

impl KycgateNode {
    /// Create a node from a validated config.
    pub fn new(config: KycgateConfig) -> Result<Self> {
        let provider = build_provider(&config.provider, config.environment)?;

        let store = match config.workflow.ttl() {
            Some(ttl) => InMemoryWorkflowStore::with_ttl(ttl),
            None => InMemoryWorkflowStore::new(),
        };
        let store: Arc<dyn WorkflowStore> =
            Arc::new(store.with_tombstone_ttl(config.workflow.tombstone_ttl()));

        let engine = Arc::new(
            OrchestrationEngine::new(provider, store, config.engine.clone())
                .with_verbose_errors(config.environment.verbose_errors()),
        );
        let node_state = Arc::new(
            NodeState::new(engine.clone(), config.environment)
                .with_max_body_bytes(config.api.max_body_bytes),
        );

        tracing::info!(
            environment = %config.environment,
            provider = engine.provider_id(),
            match_threshold = config.engine.match_threshold,
            "kycgate node created"
        );

        Ok(Self {
            config,
            engine,
            node_state,
            api_task: None,
            janitor_task: None,
        })
    }

    /// Start the HTTP API and the janitor.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting kycgate node");

        let api_addr: SocketAddr = self.config.api_addr().parse()?;
        let api_state = self.node_state.clone();
        self.api_task = Some(tokio::spawn(async move {
            if let Err(e) = crate::api::start_api_server(api_addr, api_state).await {
                tracing::error!(error = %e, "HTTP API server error");
            }
        }));

        let tracker = self.engine.tracker().clone();
        let interval = self.config.workflow.janitor_interval();
        self.janitor_task = Some(tokio::spawn(run_janitor(tracker, interval)));
        tracing::info!(
            interval_secs = interval.as_secs(),
            ttl_secs = self.config.workflow.ttl_secs,
            "workflow janitor started"
        );

        Ok(())
    }

    /// Wait until the API server task exits.
    ///
    /// The handle stays with the node while waiting, so dropping this future
    /// still leaves `shutdown` able to stop the server.
    pub async fn run(&mut self) -> Result<()> {
        let api_task = self
            .api_task
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;
        let result = api_task.await;
        self.api_task = None;
        result?;
        anyhow::bail!("HTTP API server stopped")
    }

    /// Gracefully shut down the node.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down kycgate node");

        for task in [self.api_task.take(), self.janitor_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
            // Cancellation is the expected outcome.
            let _ = task.await;
        }

        tracing::info!(
            tracked_locks = self.engine.tracker().lock_count(),
            "kycgate node shut down"
        );
        Ok(())
    }

    pub fn engine(&self) -> &Arc<OrchestrationEngine> {
        &self.engine
    }
}

/// Periodically drop expired workflow records and idle subject locks.
async fn run_janitor(tracker: Arc<WorkflowTracker>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        sweep(&tracker).await;
    }
}

async fn sweep(tracker: &WorkflowTracker) -> (usize, usize) {
    let purged = tracker.purge_expired().await;
    let pruned = tracker.prune_idle_locks();
    if purged > 0 || pruned > 0 {
        tracing::info!(purged, pruned, "workflow janitor sweep");
    } else {
        tracing::debug!("workflow janitor sweep: nothing to do");
    }
    (purged, pruned)
}
