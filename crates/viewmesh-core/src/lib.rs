//! # viewmesh-core - Replicated View Counts
//!
//! Foundation types for the view-count replication engine:
//! - Identifiers for videos and replicas
//! - [`ReplicaState`], a grow-only counter per video with one slot per replica
//! - Join semilattice traits and the pure merge function
//! - The JSON wire format exchanged between replicas
//! - The unified [`ViewMeshError`] taxonomy
//!
//! ## Design Principles
//!
//! - **Owner-only increments**: a replica only ever increments its own slot
//! - **Max within a slot**: merges take the maximum, so replays and
//!   reordering are harmless
//! - **Sum across slots**: the visible view count is the sum of all slots
//! - **Reject at the boundary**: malformed payloads never reach the merge

#![forbid(unsafe_code)]

pub mod errors;
pub mod identifiers;
pub mod report;
pub mod semilattice;
pub mod state;
pub mod wire;

pub use errors::{Result, ViewMeshError};
pub use identifiers::{ReplicaId, VideoId};
pub use report::{unknown_video_name, ReplicaViewRow, VideoViews};
pub use semilattice::{Bottom, JoinSemilattice};
pub use state::{merge, Counter, ReplicaState};
pub use wire::{decode_sync_message, encode_sync_message, SyncMessage};
