//! Operator-facing read models.

use serde::{Deserialize, Serialize};

use crate::identifiers::{ReplicaId, VideoId};
use crate::state::Counter;

/// One row of the replica contribution table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaViewRow {
    /// Display name of the video, or `Unknown (<id>)`
    pub video_name: String,
    /// Replica owning the slot
    pub replica_id: ReplicaId,
    /// Slot value as known locally
    pub views: Counter,
}

/// Live view total for one video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoViews {
    /// Video the total belongs to
    pub video_id: VideoId,
    /// Sum of all replica slots
    pub views: Counter,
}

/// Display name used when the catalog has no entry for a video
pub fn unknown_video_name(video: VideoId) -> String {
    format!("Unknown ({video})")
}
