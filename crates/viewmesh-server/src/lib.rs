//! # viewmesh-server - Replica HTTP Surface
//!
//! Wires one view-count replica together:
//! - [`ReplicaConfig`]: layered configuration (defaults, file, environment)
//! - [`router`]: axum routes for state exchange, view events and diagnostics
//! - [`ReplicaNode`]: stores, scheduler and router built from a config
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/internal/views/state` | Full local state for peers to pull |
//! | POST | `/internal/views/sync` | Merge a pushed state |
//! | GET | `/internal/views/metrics` | Sync metrics |
//! | POST | `/videos/{id}/view` | Count one view on this replica |
//! | GET | `/videos/{id}/views` | Live total across replicas |
//! | GET | `/views/replica-table` | Per-replica contributions |
//! | GET | `/health` | Liveness |

#![forbid(unsafe_code)]

pub mod config;
pub mod node;
pub mod routes;

pub use config::{parse_peer_list, ReplicaConfig};
pub use node::ReplicaNode;
pub use routes::{router, ApiError, AppState, ErrorBody, MetricsReport};
