//! Replica node wiring
//!
//! Builds the stores, the anti-entropy scheduler and the router for one
//! replica from a validated [`ReplicaConfig`].

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use viewmesh_anti_entropy::{AntiEntropyScheduler, HttpPeerClient, SyncMetrics};
use viewmesh_core::{ReplicaId, Result};
use viewmesh_store::{
    load_snapshot, AggregateStore, CounterStore, FileAggregateStore, InMemoryAggregateStore,
    InMemoryCounterStore,
};

use crate::config::ReplicaConfig;
use crate::routes::{router, AppState};

/// A fully wired replica
#[derive(Debug)]
pub struct ReplicaNode {
    config: ReplicaConfig,
    replica: ReplicaId,
    state: AppState,
    scheduler: AntiEntropyScheduler,
}

impl ReplicaNode {
    /// Validate `config` and build every component
    ///
    /// When a snapshot path is configured, the saved state is merged into
    /// the fresh counter store before anything else can touch it.
    pub async fn build(config: ReplicaConfig) -> Result<Self> {
        config.validate()?;
        let replica = config.replica()?;

        let store = Arc::new(InMemoryCounterStore::new());
        if let Some(path) = &config.snapshot_path {
            let restored = load_snapshot(path).await?;
            let outcome = store.merge_state(&restored).await?;
            info!(
                path = %path.display(),
                slots = outcome.slots_seen,
                "Restored counter snapshot"
            );
        }

        let aggregates: Arc<dyn AggregateStore> = match &config.aggregate_path {
            Some(path) => Arc::new(FileAggregateStore::open(path).await?),
            None => Arc::new(InMemoryAggregateStore::new()),
        };

        let anti_entropy = config.anti_entropy();
        let client = HttpPeerClient::new(anti_entropy.peer_timeout)?;
        let metrics = Arc::new(SyncMetrics::new());
        let peers: Arc<[String]> = anti_entropy.peers.clone().into();

        let mut scheduler =
            AntiEntropyScheduler::new(anti_entropy, store.clone(), aggregates, Arc::new(client))
                .with_metrics(metrics.clone());
        if let Some(path) = &config.snapshot_path {
            scheduler = scheduler.with_snapshot_path(path.clone());
        }

        let state = AppState {
            replica: replica.clone(),
            store,
            catalog: Arc::new(config.catalog()?),
            metrics,
            peers,
        };

        Ok(Self {
            config,
            replica,
            state,
            scheduler,
        })
    }

    /// Identity of this replica
    pub fn replica(&self) -> &ReplicaId {
        &self.replica
    }

    /// Configuration the node was built from
    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    /// Live counter store
    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.state.store
    }

    /// Anti-entropy scheduler
    pub fn scheduler(&self) -> &AntiEntropyScheduler {
        &self.scheduler
    }

    /// Router serving this replica's endpoints
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Start the loops, serve HTTP until `shutdown` resolves, then stop
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = self.scheduler.start() {
            warn!(error = %e, "Anti-entropy scheduler failed to start");
        }

        let addr = listener.local_addr()?;
        info!(replica = %self.replica, %addr, "Serving view-count replica");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;
        self.shutdown().await;
        result
    }

    /// Stop the loops and run one last best-effort flush
    pub async fn shutdown(&self) {
        self.scheduler.stop();
        match self.scheduler.flush_now().await {
            Ok(report) => info!(written = report.totals_written, "Final flush complete"),
            Err(e) => warn!(error = %e, "Final flush failed"),
        }
    }
}
