//! Sync metrics
//!
//! Lock-free counters shared by the loops and the HTTP handlers. Reads go
//! through [`SyncMetrics::snapshot`], which is what the metrics endpoint
//! serializes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Operational counters for anti-entropy activity
#[derive(Debug, Default)]
pub struct SyncMetrics {
    pull_rounds_total: AtomicU64,
    peer_fetches_succeeded_total: AtomicU64,
    peer_fetches_failed_total: AtomicU64,
    slots_advanced_total: AtomicU64,
    inbound_syncs_accepted_total: AtomicU64,
    inbound_syncs_rejected_total: AtomicU64,
    flush_rounds_total: AtomicU64,
    aggregate_writes_total: AtomicU64,
    aggregate_write_failures_total: AtomicU64,
    snapshot_failures_total: AtomicU64,
    last_pull_success_ms: AtomicU64,
    last_flush_ms: AtomicU64,
}

/// Point-in-time copy of [`SyncMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetricsSnapshot {
    /// Pull rounds started
    pub pull_rounds_total: u64,
    /// Peer fetches merged successfully
    pub peer_fetches_succeeded_total: u64,
    /// Peer fetches that failed or returned a malformed body
    pub peer_fetches_failed_total: u64,
    /// Slots raised by pulls and inbound syncs
    pub slots_advanced_total: u64,
    /// Inbound sync pushes merged
    pub inbound_syncs_accepted_total: u64,
    /// Inbound sync pushes rejected as malformed
    pub inbound_syncs_rejected_total: u64,
    /// Flush rounds completed
    pub flush_rounds_total: u64,
    /// Aggregate totals written
    pub aggregate_writes_total: u64,
    /// Aggregate writes that failed
    pub aggregate_write_failures_total: u64,
    /// Snapshot saves that failed
    pub snapshot_failures_total: u64,
    /// Unix millis of the last successful peer fetch, 0 if none
    pub last_pull_success_ms: u64,
    /// Unix millis of the last completed flush round, 0 if none
    pub last_flush_ms: u64,
}

impl SyncMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a pull round
    pub fn record_pull_round(&self) {
        self.pull_rounds_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful fetch-and-merge from one peer
    pub fn record_peer_success(&self, slots_advanced: usize) {
        self.peer_fetches_succeeded_total.fetch_add(1, Ordering::Relaxed);
        self.slots_advanced_total.fetch_add(slots_advanced as u64, Ordering::Relaxed);
        self.last_pull_success_ms.store(now_millis(), Ordering::Relaxed);
    }

    /// Record a failed fetch or merge for one peer
    pub fn record_peer_failure(&self) {
        self.peer_fetches_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound sync push that was merged
    pub fn record_inbound_accepted(&self, slots_advanced: usize) {
        self.inbound_syncs_accepted_total.fetch_add(1, Ordering::Relaxed);
        self.slots_advanced_total.fetch_add(slots_advanced as u64, Ordering::Relaxed);
    }

    /// Record an inbound sync push rejected before merging
    pub fn record_inbound_rejected(&self) {
        self.inbound_syncs_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one aggregate write outcome
    pub fn record_aggregate_write(&self, ok: bool) {
        let counter = if ok {
            &self.aggregate_writes_total
        } else {
            &self.aggregate_write_failures_total
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed snapshot save
    pub fn record_snapshot_failure(&self) {
        self.snapshot_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the end of a flush round
    pub fn record_flush_round(&self) {
        self.flush_rounds_total.fetch_add(1, Ordering::Relaxed);
        self.last_flush_ms.store(now_millis(), Ordering::Relaxed);
    }

    /// Copy every counter
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            pull_rounds_total: self.pull_rounds_total.load(Ordering::Relaxed),
            peer_fetches_succeeded_total: self.peer_fetches_succeeded_total.load(Ordering::Relaxed),
            peer_fetches_failed_total: self.peer_fetches_failed_total.load(Ordering::Relaxed),
            slots_advanced_total: self.slots_advanced_total.load(Ordering::Relaxed),
            inbound_syncs_accepted_total: self.inbound_syncs_accepted_total.load(Ordering::Relaxed),
            inbound_syncs_rejected_total: self.inbound_syncs_rejected_total.load(Ordering::Relaxed),
            flush_rounds_total: self.flush_rounds_total.load(Ordering::Relaxed),
            aggregate_writes_total: self.aggregate_writes_total.load(Ordering::Relaxed),
            aggregate_write_failures_total: self
                .aggregate_write_failures_total
                .load(Ordering::Relaxed),
            snapshot_failures_total: self.snapshot_failures_total.load(Ordering::Relaxed),
            last_pull_success_ms: self.last_pull_success_ms.load(Ordering::Relaxed),
            last_flush_ms: self.last_flush_ms.load(Ordering::Relaxed),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
