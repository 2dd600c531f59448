//! # viewmesh-store - Storage Capabilities
//!
//! Storage boundaries used by the view-count engine:
//! - [`CounterStore`]: per (video, replica) slots with atomic increment and
//!   atomic max-merge, the only state shared between request handlers and
//!   the anti-entropy loops
//! - [`AggregateStore`]: durable per-video totals written by the flush loop
//! - [`VideoCatalog`]: video display names for the diagnostic table
//! - Snapshot persistence for restoring counters after a restart
//!
//! Every capability is a trait so the atomicity contract lives at one
//! boundary regardless of the backing technology.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod catalog;
pub mod counter;
pub mod snapshot;

pub use aggregate::{AggregateStore, FileAggregateStore, InMemoryAggregateStore};
pub use catalog::{StaticVideoCatalog, VideoCatalog};
pub use counter::{CounterStore, InMemoryCounterStore, MergeOutcome};
pub use snapshot::{load_snapshot, save_snapshot};
