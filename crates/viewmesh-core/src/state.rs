//! Grow-only view counters and the merge engine
//!
//! A [`ReplicaState`] maps every video to one counter slot per replica.
//! Each slot only ever tracks what its owning replica counted locally, so
//! the visible view count is the *sum* across slots, while merging two
//! states takes the *max* within each slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ViewMeshError};
use crate::identifiers::{ReplicaId, VideoId};
use crate::semilattice::{Bottom, JoinSemilattice};

/// Non-negative, monotonically non-decreasing slot value
pub type Counter = u64;

/// Snapshot of every (video, replica) slot one replica knows about
///
/// Ordered maps keep iteration and serialization canonical, so two equal
/// states always encode to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaState {
    videos: BTreeMap<VideoId, BTreeMap<ReplicaId, Counter>>,
}

impl ReplicaState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a single slot, 0 when unknown
    pub fn get(&self, video: VideoId, replica: &ReplicaId) -> Counter {
        self.videos
            .get(&video)
            .and_then(|slots| slots.get(replica))
            .copied()
            .unwrap_or(0)
    }

    /// Visible view count for a video: the sum of every replica slot
    pub fn total(&self, video: VideoId) -> Counter {
        self.videos
            .get(&video)
            .map(|slots| slots.values().fold(0u64, |acc, v| acc.saturating_add(*v)))
            .unwrap_or(0)
    }

    /// Videos present in this state, in ascending order
    pub fn videos(&self) -> impl Iterator<Item = VideoId> + '_ {
        self.videos.keys().copied()
    }

    /// Every (video, replica, counter) triple, ordered by video then replica
    pub fn iter_slots(&self) -> impl Iterator<Item = (VideoId, &ReplicaId, Counter)> + '_ {
        self.videos.iter().flat_map(|(video, slots)| {
            slots
                .iter()
                .map(move |(replica, counter)| (*video, replica, *counter))
        })
    }

    /// Number of (video, replica) slots
    pub fn slot_count(&self) -> usize {
        self.videos.values().map(BTreeMap::len).sum()
    }

    /// Whether no slot is recorded
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Add `delta` to a slot owned by `replica`
    ///
    /// A zero delta on an absent slot leaves the state untouched. On
    /// overflow the slot keeps its previous value.
    pub fn increment(
        &mut self,
        video: VideoId,
        replica: &ReplicaId,
        delta: Counter,
    ) -> Result<Counter> {
        if delta == 0 {
            return Ok(self.get(video, replica));
        }
        let slot = self
            .videos
            .entry(video)
            .or_default()
            .entry(replica.clone())
            .or_insert(0);
        let next = slot
            .checked_add(delta)
            .ok_or_else(|| ViewMeshError::CounterOverflow {
                video,
                replica: replica.clone(),
            })?;
        *slot = next;
        Ok(next)
    }

    /// Raise a slot to `incoming` if that is larger; returns the new value
    ///
    /// An incoming zero never creates a slot.
    pub fn merge_slot(
        &mut self,
        video: VideoId,
        replica: &ReplicaId,
        incoming: Counter,
    ) -> Counter {
        let current = self.get(video, replica);
        if incoming <= current {
            return current;
        }
        self.videos
            .entry(video)
            .or_default()
            .insert(replica.clone(), incoming);
        incoming
    }
}

impl JoinSemilattice for ReplicaState {
    fn join(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.join_assign(other);
        merged
    }

    fn join_assign(&mut self, other: &Self) {
        for (video, slots) in &other.videos {
            let local = self.videos.entry(*video).or_default();
            for (replica, counter) in slots {
                local
                    .entry(replica.clone())
                    .and_modify(|c| *c = c.join(counter))
                    .or_insert(*counter);
            }
        }
    }
}

impl Bottom for ReplicaState {
    fn bottom() -> Self {
        Self::new()
    }
}

impl FromIterator<(VideoId, ReplicaId, Counter)> for ReplicaState {
    fn from_iter<I: IntoIterator<Item = (VideoId, ReplicaId, Counter)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (video, replica, counter) in iter {
            state
                .videos
                .entry(video)
                .or_default()
                .entry(replica)
                .and_modify(|c| *c = c.join(&counter))
                .or_insert(counter);
        }
        state
    }
}

/// Combine a local and a remote snapshot into their converged state
///
/// `merged[v][r] = max(local[v][r], remote[v][r])` for every pair present
/// in either input. Never fails on well-typed input.
pub fn merge(local: &ReplicaState, remote: &ReplicaState) -> ReplicaState {
    local.join(remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(name: &str) -> ReplicaId {
        ReplicaId::new(name).unwrap()
    }

    #[test]
    fn test_total_sums_slots() {
        let state: ReplicaState = [
            (VideoId(42), rid("r1"), 3),
            (VideoId(42), rid("r2"), 2),
            (VideoId(7), rid("r1"), 10),
        ]
        .into_iter()
        .collect();

        assert_eq!(state.total(VideoId(42)), 5);
        assert_eq!(state.total(VideoId(7)), 10);
        assert_eq!(state.total(VideoId(99)), 0);
        assert_eq!(state.slot_count(), 3);
    }

    #[test]
    fn test_merge_takes_max_per_slot() {
        let local: ReplicaState = [(VideoId(1), rid("r1"), 3), (VideoId(1), rid("r2"), 1)]
            .into_iter()
            .collect();
        let remote: ReplicaState = [(VideoId(1), rid("r1"), 2), (VideoId(1), rid("r2"), 4)]
            .into_iter()
            .collect();

        let merged = merge(&local, &remote);
        assert_eq!(merged.get(VideoId(1), &rid("r1")), 3);
        assert_eq!(merged.get(VideoId(1), &rid("r2")), 4);
        assert_eq!(merged.total(VideoId(1)), 7);
    }

    #[test]
    fn test_increment_zero_does_not_create_slot() {
        let mut state = ReplicaState::new();
        assert_eq!(state.increment(VideoId(5), &rid("r1"), 0).unwrap(), 0);
        assert!(state.is_empty());

        assert_eq!(state.increment(VideoId(5), &rid("r1"), 2).unwrap(), 2);
        assert_eq!(state.increment(VideoId(5), &rid("r1"), 1).unwrap(), 3);
    }

    #[test]
    fn test_increment_overflow_keeps_value() {
        let mut state = ReplicaState::new();
        state.merge_slot(VideoId(1), &rid("r1"), u64::MAX - 1);

        let err = state.increment(VideoId(1), &rid("r1"), 5).unwrap_err();
        assert!(matches!(err, ViewMeshError::CounterOverflow { .. }));
        assert_eq!(state.get(VideoId(1), &rid("r1")), u64::MAX - 1);
    }

    #[test]
    fn test_merge_slot_ignores_stale_and_zero() {
        let mut state = ReplicaState::new();
        assert_eq!(state.merge_slot(VideoId(1), &rid("r1"), 0), 0);
        assert!(state.is_empty());

        assert_eq!(state.merge_slot(VideoId(1), &rid("r1"), 3), 3);
        assert_eq!(state.merge_slot(VideoId(1), &rid("r1"), 2), 3);
        assert_eq!(state.get(VideoId(1), &rid("r1")), 3);
    }

    #[test]
    fn test_total_saturates() {
        let state: ReplicaState = [(VideoId(1), rid("a"), u64::MAX), (VideoId(1), rid("b"), 1)]
            .into_iter()
            .collect();
        assert_eq!(state.total(VideoId(1)), u64::MAX);
    }
}
