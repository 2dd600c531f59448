//! Flush round: project live counters into durable storage
//!
//! Totals are read from the counter store one video at a time and handed
//! to the aggregate store as one batch. No counter lock is held across the
//! aggregate write, so increments keep flowing during a flush and are
//! picked up by the next round.

use std::path::Path;

use serde::{Deserialize, Serialize};

use viewmesh_core::Result;
use viewmesh_store::{save_snapshot, AggregateStore, CounterStore};

use crate::metrics::SyncMetrics;

/// Outcome of one flush round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    /// Videos enumerated from the counter store
    pub videos_seen: usize,
    /// Totals upserted into the aggregate store
    pub totals_written: usize,
    /// Videos skipped because their total was zero
    pub totals_skipped: usize,
    /// Aggregate writes that failed
    pub write_failures: usize,
    /// Whether a counter snapshot was saved this round
    pub snapshot_saved: bool,
}

/// Run one flush round
///
/// Fails only when the counter store cannot be enumerated. Individual
/// aggregate write failures are logged and counted; the remaining videos
/// are still written.
pub async fn flush_round(
    store: &dyn CounterStore,
    aggregates: &dyn AggregateStore,
    snapshot_path: Option<&Path>,
    metrics: &SyncMetrics,
) -> Result<FlushReport> {
    let videos = store.videos().await?;
    let mut report = FlushReport {
        videos_seen: videos.len(),
        ..FlushReport::default()
    };

    tracing::info!(videos = videos.len(), "Flushing view totals");

    let mut batch = Vec::with_capacity(videos.len());
    for video in videos {
        let total = match store.total(video).await {
            Ok(total) => total,
            Err(e) => {
                tracing::error!(video = %video, error = %e, "Failed to read view total");
                report.write_failures += 1;
                continue;
            }
        };
        if total == 0 {
            report.totals_skipped += 1;
            continue;
        }
        batch.push((video, total));
    }

    let outcomes = aggregates.set_views_counts(&batch).await;
    for (&(video, total), outcome) in batch.iter().zip(outcomes) {
        match outcome {
            Ok(()) => {
                tracing::debug!(video = %video, total, "Persisted view total");
                metrics.record_aggregate_write(true);
                report.totals_written += 1;
            }
            Err(e) => {
                tracing::error!(video = %video, error = %e, "Failed to persist view total");
                metrics.record_aggregate_write(false);
                report.write_failures += 1;
            }
        }
    }

    if let Some(path) = snapshot_path {
        match save_state(store, path).await {
            Ok(()) => report.snapshot_saved = true,
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to save counter snapshot"
                );
                metrics.record_snapshot_failure();
            }
        }
    }

    metrics.record_flush_round();
    tracing::info!(
        written = report.totals_written,
        failed = report.write_failures,
        "Flush round complete"
    );
    Ok(report)
}

async fn save_state(store: &dyn CounterStore, path: &Path) -> Result<()> {
    let state = store.snapshot_all().await?;
    save_snapshot(path, &state).await
}
