//! Unified error system for the view-count engine
//!
//! A single error type covers the whole subsystem. Failures inside the
//! anti-entropy loops are contained and logged; none of these errors is
//! ever surfaced to an end user as an application failure.

use crate::identifiers::{ReplicaId, VideoId};

/// Unified error type for all viewmesh operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewMeshError {
    /// Increment called with a negative delta
    #[error("Invalid delta: {delta} (counter deltas must be non-negative)")]
    InvalidDelta {
        /// The rejected delta
        delta: i64,
    },

    /// Increment would push a slot past the counter range
    #[error("Counter overflow for video {video} replica {replica}")]
    CounterOverflow {
        /// Video whose slot would overflow
        video: VideoId,
        /// Replica owning the slot
        replica: ReplicaId,
    },

    /// Network failure, timeout or non-success status talking to a peer
    #[error("Peer unreachable: {peer}: {message}")]
    PeerUnreachable {
        /// Peer base URL
        peer: String,
        /// Error message describing the failure
        message: String,
    },

    /// Sync payload failed to decode or validate
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Error message describing the decode failure
        message: String,
    },

    /// Counter store or aggregate store could not be reached
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Error message describing the storage failure
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },
}

impl ViewMeshError {
    /// Create an invalid delta error
    pub fn invalid_delta(delta: i64) -> Self {
        Self::InvalidDelta { delta }
    }

    /// Create a peer unreachable error
    pub fn peer_unreachable(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PeerUnreachable {
            peer: peer.into(),
            message: message.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Create a store unavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDelta { .. } => "invalid_delta",
            Self::CounterOverflow { .. } => "counter_overflow",
            Self::PeerUnreachable { .. } => "peer_unreachable",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::Invalid { .. } => "invalid",
        }
    }

    /// Whether the failure is expected to clear up on a later tick
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::PeerUnreachable { .. } | Self::StoreUnavailable { .. }
        )
    }
}

/// Standard Result type for viewmesh operations
pub type Result<T> = std::result::Result<T, ViewMeshError>;

impl From<std::io::Error> for ViewMeshError {
    fn from(err: std::io::Error) -> Self {
        Self::store_unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ViewMeshError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}
