//! Operator view of per-replica contributions

use std::collections::BTreeMap;

use viewmesh_core::{unknown_video_name, ReplicaViewRow, Result};
use viewmesh_store::{CounterStore, VideoCatalog};

/// One row per (video, replica) slot, ordered by video then replica
///
/// Videos without a catalog entry are named `Unknown (<id>)`.
pub async fn replica_table(
    store: &dyn CounterStore,
    catalog: &dyn VideoCatalog,
) -> Result<Vec<ReplicaViewRow>> {
    let state = store.snapshot_all().await?;
    let mut names = BTreeMap::new();
    for video in state.videos() {
        let name = catalog
            .display_name(video)
            .await
            .unwrap_or_else(|| unknown_video_name(video));
        names.insert(video, name);
    }

    Ok(state
        .iter_slots()
        .map(|(video, replica, views)| ReplicaViewRow {
            video_name: names
                .get(&video)
                .cloned()
                .unwrap_or_else(|| unknown_video_name(video)),
            replica_id: replica.clone(),
            views,
        })
        .collect())
}
