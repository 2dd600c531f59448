//! # viewmesh-anti-entropy - Replica Reconciliation Loops
//!
//! Two independent periodic loops keep replicas convergent:
//!
//! - **Pull**: fetch every peer's full state and fold it into the local
//!   counter store with a per-slot max
//! - **Flush**: sum each video's slots and upsert positive totals into the
//!   durable aggregate store
//!
//! # Design Principles
//!
//! - **Contained failures**: a peer or store error is logged and the loop
//!   keeps going; the next tick retries
//! - **No retry state**: idempotent merges make the schedule itself the
//!   retry policy
//! - **Peer independence**: peers are polled concurrently and one slow or
//!   failing peer never holds back another
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use viewmesh_anti_entropy::{AntiEntropyConfig, AntiEntropyScheduler, HttpPeerClient};
//! use viewmesh_store::{InMemoryAggregateStore, InMemoryCounterStore};
//!
//! # fn run() -> viewmesh_core::Result<()> {
//! let config = AntiEntropyConfig::default().with_peers(["http://replica-b:8080"]);
//! let client = HttpPeerClient::new(config.peer_timeout)?;
//! let scheduler = AntiEntropyScheduler::new(
//!     config,
//!     Arc::new(InMemoryCounterStore::new()),
//!     Arc::new(InMemoryAggregateStore::new()),
//!     Arc::new(client),
//! );
//! scheduler.start()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

// =============================================================================
// Configuration and transport
// =============================================================================

pub mod config;
pub mod peer;

// =============================================================================
// Rounds
// =============================================================================

pub mod diagnostics;
pub mod flush;
pub mod pull;

// =============================================================================
// Scheduling and observability
// =============================================================================

pub mod metrics;
pub mod scheduler;
pub mod tasks;

pub use config::AntiEntropyConfig;
pub use diagnostics::replica_table;
pub use flush::{flush_round, FlushReport};
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use peer::{state_url, HttpPeerClient, PeerClient, STATE_PATH};
pub use pull::{pull_round, PullReport};
pub use scheduler::{AntiEntropyScheduler, SchedulerState};
pub use tasks::TaskRegistry;
