//! Sync wire format
//!
//! JSON shape exchanged by `GET /internal/views/state` and
//! `POST /internal/views/sync`:
//!
//! ```json
//! { "videoViews": { "42": { "replica-1": 3, "replica-2": 2 } },
//!   "sourceReplicaName": "replica-1" }
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ViewMeshError};
use crate::identifiers::ReplicaId;
use crate::state::ReplicaState;

/// A full state snapshot tagged with the replica that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    /// videoId -> (replicaId -> counter)
    #[serde(default)]
    pub video_views: ReplicaState,
    /// Origin replica
    pub source_replica_name: ReplicaId,
}

impl SyncMessage {
    /// Create a sync message for `origin`
    pub fn new(video_views: ReplicaState, origin: ReplicaId) -> Self {
        Self {
            video_views,
            source_replica_name: origin,
        }
    }

    /// Replica that produced this snapshot
    pub fn origin(&self) -> &ReplicaId {
        &self.source_replica_name
    }
}

/// Encode a sync message to JSON bytes
pub fn encode_sync_message(msg: &SyncMessage) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).map_err(|e| ViewMeshError::invalid(e.to_string()))
}

/// Decode and validate a sync message
///
/// Any structural problem (wrong types, negative or fractional counters,
/// non-integer video keys, blank replica names) becomes `MalformedPayload`.
pub fn decode_sync_message(bytes: &[u8]) -> Result<SyncMessage> {
    serde_json::from_slice(bytes).map_err(|e| ViewMeshError::malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::VideoId;

    #[test]
    fn test_wire_shape() {
        let r1 = ReplicaId::new("replica-1").unwrap();
        let state: ReplicaState = [(VideoId(42), r1.clone(), 3)].into_iter().collect();
        let msg = SyncMessage::new(state, r1);

        let json: serde_json::Value =
            serde_json::from_slice(&encode_sync_message(&msg).unwrap()).unwrap();
        assert_eq!(json["videoViews"]["42"]["replica-1"], 3);
        assert_eq!(json["sourceReplicaName"], "replica-1");
    }

    #[test]
    fn test_decode_accepts_missing_views() {
        let msg = decode_sync_message(br#"{"sourceReplicaName":"r2"}"#).unwrap();
        assert!(msg.video_views.is_empty());
        assert_eq!(msg.origin().as_str(), "r2");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let cases: [&[u8]; 6] = [
            b"not json",
            br#"{"videoViews":{"42":{"r1":-1}},"sourceReplicaName":"r1"}"#,
            br#"{"videoViews":{"abc":{"r1":1}},"sourceReplicaName":"r1"}"#,
            br#"{"videoViews":{"42":{"":1}},"sourceReplicaName":"r1"}"#,
            br#"{"videoViews":{"42":{"r1":1.5}},"sourceReplicaName":"r1"}"#,
            br#"{"videoViews":{}}"#,
        ];
        for body in cases {
            let err = decode_sync_message(body).unwrap_err();
            assert!(
                matches!(err, ViewMeshError::MalformedPayload { .. }),
                "expected malformed for {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }
}
