//! Pull round: fetch every peer's state and fold it into the local store

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use viewmesh_core::Result;
use viewmesh_store::{CounterStore, MergeOutcome};

use crate::metrics::SyncMetrics;
use crate::peer::PeerClient;

/// Outcome of one pull round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullReport {
    /// Peers contacted
    pub peers_polled: usize,
    /// Peers whose state was merged
    pub peers_merged: usize,
    /// Peers skipped because of an error
    pub peers_failed: usize,
    /// Local slots raised across all peers
    pub slots_advanced: usize,
}

/// Run one pull round against `peers`
///
/// Every peer is fetched and merged independently and concurrently. A
/// failing peer is logged and skipped; it never prevents or delays the
/// merge of another peer's state.
pub async fn pull_round(
    store: &dyn CounterStore,
    client: &dyn PeerClient,
    peers: &[String],
    metrics: &SyncMetrics,
) -> PullReport {
    metrics.record_pull_round();

    let results = join_all(
        peers
            .iter()
            .map(|peer| async move { (peer, pull_peer(store, client, peer).await) }),
    )
    .await;

    let mut report = PullReport {
        peers_polled: peers.len(),
        ..PullReport::default()
    };

    for (peer, result) in results {
        match result {
            Ok(outcome) => {
                tracing::info!(
                    peer = %peer,
                    slots = outcome.slots_seen,
                    advanced = outcome.slots_advanced,
                    "Merged state from peer"
                );
                metrics.record_peer_success(outcome.slots_advanced);
                report.peers_merged += 1;
                report.slots_advanced += outcome.slots_advanced;
            }
            Err(e) => {
                tracing::warn!(
                    peer = %peer,
                    code = e.code(),
                    error = %e,
                    "Failed to sync with peer"
                );
                metrics.record_peer_failure();
                report.peers_failed += 1;
            }
        }
    }

    report
}

async fn pull_peer(
    store: &dyn CounterStore,
    client: &dyn PeerClient,
    peer: &str,
) -> Result<MergeOutcome> {
    let message = client.fetch_state(peer).await?;
    tracing::debug!(
        peer = %peer,
        origin = %message.origin(),
        slots = message.video_views.slot_count(),
        "Received peer state"
    );
    store.merge_state(&message.video_views).await
}
