//! Anti-entropy scheduler
//!
//! Owns the pull loop and the flush loop for one replica. Both loops share
//! nothing but the counter store; either can also be driven one round at a
//! time through [`AntiEntropyScheduler::pull_now`] and
//! [`AntiEntropyScheduler::flush_now`].

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use viewmesh_core::{Result, ViewMeshError};
use viewmesh_store::{AggregateStore, CounterStore};

use crate::config::AntiEntropyConfig;
use crate::flush::{flush_round, FlushReport};
use crate::metrics::SyncMetrics;
use crate::peer::PeerClient;
use crate::pull::{pull_round, PullReport};
use crate::tasks::TaskRegistry;

/// Lifecycle state of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Loops not running
    Stopped,
    /// Loops running
    Running,
}

/// Drives periodic pull and flush rounds for one replica
pub struct AntiEntropyScheduler {
    config: AntiEntropyConfig,
    store: Arc<dyn CounterStore>,
    aggregates: Arc<dyn AggregateStore>,
    client: Arc<dyn PeerClient>,
    metrics: Arc<SyncMetrics>,
    snapshot_path: Option<PathBuf>,
    state: RwLock<SchedulerState>,
    tasks: Mutex<Option<TaskRegistry>>,
}

impl std::fmt::Debug for AntiEntropyScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntiEntropyScheduler")
            .field("config", &self.config)
            .field("snapshot_path", &self.snapshot_path)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl AntiEntropyScheduler {
    /// Create a stopped scheduler
    pub fn new(
        config: AntiEntropyConfig,
        store: Arc<dyn CounterStore>,
        aggregates: Arc<dyn AggregateStore>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        Self {
            config,
            store,
            aggregates,
            client,
            metrics: Arc::new(SyncMetrics::new()),
            snapshot_path: None,
            state: RwLock::new(SchedulerState::Stopped),
            tasks: Mutex::new(None),
        }
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Save a counter snapshot to `path` on every flush round
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Scheduler configuration
    pub fn config(&self) -> &AntiEntropyConfig {
        &self.config
    }

    /// Shared metrics collector
    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Whether the loops are running
    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Spawn the flush loop, and the pull loop when peers are configured
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        self.config.validate()?;

        let mut tasks = self.tasks.lock();
        if tasks.is_some() {
            return Err(ViewMeshError::invalid("anti-entropy scheduler already running"));
        }

        let registry = TaskRegistry::new();

        if self.config.pull_enabled() {
            let store = self.store.clone();
            let client = self.client.clone();
            let metrics = self.metrics.clone();
            let peers: Arc<[String]> = self.config.peers.clone().into();
            registry.spawn_interval("pull", self.config.pull_interval, move || {
                let store = store.clone();
                let client = client.clone();
                let metrics = metrics.clone();
                let peers = peers.clone();
                async move {
                    pull_round(store.as_ref(), client.as_ref(), &peers, &metrics).await;
                }
            });
        } else {
            tracing::info!("No peers configured, pull loop disabled");
        }

        let store = self.store.clone();
        let aggregates = self.aggregates.clone();
        let metrics = self.metrics.clone();
        let snapshot_path = self.snapshot_path.clone();
        registry.spawn_interval("flush", self.config.flush_interval, move || {
            let store = store.clone();
            let aggregates = aggregates.clone();
            let metrics = metrics.clone();
            let snapshot_path = snapshot_path.clone();
            async move {
                if let Err(e) = flush_round(
                    store.as_ref(),
                    aggregates.as_ref(),
                    snapshot_path.as_deref(),
                    &metrics,
                )
                .await
                {
                    tracing::error!(error = %e, "Flush round failed");
                }
            }
        });

        *tasks = Some(registry);
        *self.state.write() = SchedulerState::Running;
        tracing::info!(
            peers = self.config.peers.len(),
            pull_interval_ms = self.config.pull_interval.as_millis() as u64,
            flush_interval_ms = self.config.flush_interval.as_millis() as u64,
            "Anti-entropy scheduler started"
        );
        Ok(())
    }

    /// Stop both loops, abandoning any in-flight round
    pub fn stop(&self) {
        if let Some(registry) = self.tasks.lock().take() {
            registry.shutdown();
            tracing::info!("Anti-entropy scheduler stopped");
        }
        *self.state.write() = SchedulerState::Stopped;
    }

    /// Run one pull round now
    pub async fn pull_now(&self) -> PullReport {
        pull_round(
            self.store.as_ref(),
            self.client.as_ref(),
            &self.config.peers,
            &self.metrics,
        )
        .await
    }

    /// Run one flush round now
    pub async fn flush_now(&self) -> Result<FlushReport> {
        flush_round(
            self.store.as_ref(),
            self.aggregates.as_ref(),
            self.snapshot_path.as_deref(),
            &self.metrics,
        )
        .await
    }
}

impl Drop for AntiEntropyScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
