//! Counter store capability and in-memory backend
//!
//! # Blocking Lock Usage
//!
//! [`InMemoryCounterStore`] uses `parking_lot::RwLock` because:
//! 1. Every read-modify-write is a single in-memory map update
//! 2. The lock is never held across `.await` points
//! 3. No I/O happens inside the lock scope

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use viewmesh_core::{Counter, ReplicaId, ReplicaState, Result, VideoId, ViewMeshError};

/// Result of folding a remote state into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Slots present in the incoming state
    pub slots_seen: usize,
    /// Slots whose local value was raised
    pub slots_advanced: usize,
}

impl MergeOutcome {
    /// Whether the merge changed any local slot
    pub fn changed(&self) -> bool {
        self.slots_advanced > 0
    }
}

/// Process-local store of replica counter slots
///
/// Implementations must make `increment` and `merge_slot` atomic per
/// (video, replica) key: two concurrent increments must both be reflected,
/// and a concurrent increment and merge must not drop either update.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add `delta` to the slot owned by `replica`, returning the new value
    ///
    /// Fails with `InvalidDelta` for a negative delta without touching the
    /// stored value.
    async fn increment(&self, video: VideoId, replica: &ReplicaId, delta: i64) -> Result<Counter>;

    /// Raise the slot to `max(current, incoming)`, returning the new value
    async fn merge_slot(
        &self,
        video: VideoId,
        replica: &ReplicaId,
        incoming: Counter,
    ) -> Result<Counter>;

    /// Fold every pair of `remote` through [`CounterStore::merge_slot`]
    async fn merge_state(&self, remote: &ReplicaState) -> Result<MergeOutcome> {
        let mut outcome = MergeOutcome::default();
        for (video, replica, incoming) in remote.iter_slots() {
            let before = self.slot(video, replica).await?;
            let after = self.merge_slot(video, replica, incoming).await?;
            outcome.slots_seen += 1;
            if after > before {
                outcome.slots_advanced += 1;
            }
        }
        Ok(outcome)
    }

    /// Current value of one slot, 0 when unknown
    async fn slot(&self, video: VideoId, replica: &ReplicaId) -> Result<Counter>;

    /// Every (video, replica) pair currently known
    async fn snapshot_all(&self) -> Result<ReplicaState>;

    /// Sum of all replica slots known for `video`
    async fn total(&self, video: VideoId) -> Result<Counter>;

    /// Every video that currently has at least one slot
    async fn videos(&self) -> Result<Vec<VideoId>>;
}

/// Counter store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    state: RwLock<ReplicaState>,
}

impl InMemoryCounterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a previously saved state
    pub fn with_state(state: ReplicaState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, video: VideoId, replica: &ReplicaId, delta: i64) -> Result<Counter> {
        let delta = u64::try_from(delta).map_err(|_| ViewMeshError::invalid_delta(delta))?;
        self.state.write().increment(video, replica, delta)
    }

    async fn merge_slot(
        &self,
        video: VideoId,
        replica: &ReplicaId,
        incoming: Counter,
    ) -> Result<Counter> {
        Ok(self.state.write().merge_slot(video, replica, incoming))
    }

    async fn merge_state(&self, remote: &ReplicaState) -> Result<MergeOutcome> {
        let mut outcome = MergeOutcome::default();
        let mut state = self.state.write();
        for (video, replica, incoming) in remote.iter_slots() {
            outcome.slots_seen += 1;
            if incoming > state.get(video, replica) {
                state.merge_slot(video, replica, incoming);
                outcome.slots_advanced += 1;
            }
        }
        Ok(outcome)
    }

    async fn slot(&self, video: VideoId, replica: &ReplicaId) -> Result<Counter> {
        Ok(self.state.read().get(video, replica))
    }

    async fn snapshot_all(&self) -> Result<ReplicaState> {
        Ok(self.state.read().clone())
    }

    async fn total(&self, video: VideoId) -> Result<Counter> {
        Ok(self.state.read().total(video))
    }

    async fn videos(&self) -> Result<Vec<VideoId>> {
        Ok(self.state.read().videos().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(name: &str) -> ReplicaId {
        ReplicaId::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_increment_and_total() {
        let store = InMemoryCounterStore::new();
        let r1 = rid("r1");

        assert_eq!(store.increment(VideoId(42), &r1, 1).await.unwrap(), 1);
        assert_eq!(store.increment(VideoId(42), &r1, 2).await.unwrap(), 3);
        assert_eq!(store.total(VideoId(42)).await.unwrap(), 3);
        assert_eq!(store.videos().await.unwrap(), vec![VideoId(42)]);
    }

    #[tokio::test]
    async fn test_negative_delta_rejected() {
        let store = InMemoryCounterStore::new();
        let r1 = rid("r1");
        store.increment(VideoId(1), &r1, 4).await.unwrap();

        let err = store.increment(VideoId(1), &r1, -1).await.unwrap_err();
        assert_eq!(err, ViewMeshError::invalid_delta(-1));
        assert_eq!(store.slot(VideoId(1), &r1).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_merge_state_reports_advanced_slots() {
        let store = InMemoryCounterStore::new();
        store.merge_slot(VideoId(1), &rid("r1"), 5).await.unwrap();

        let remote: ReplicaState = [
            (VideoId(1), rid("r1"), 3),
            (VideoId(1), rid("r2"), 2),
            (VideoId(2), rid("r2"), 0),
        ]
        .into_iter()
        .collect();

        let outcome = store.merge_state(&remote).await.unwrap();
        assert_eq!(outcome.slots_seen, 3);
        assert_eq!(outcome.slots_advanced, 1);
        assert!(outcome.changed());
        assert_eq!(store.total(VideoId(1)).await.unwrap(), 7);
        assert_eq!(store.videos().await.unwrap(), vec![VideoId(1)]);
    }
}
