//! Concurrency tests for the in-memory counter store
//!
//! Request handlers increment while the pull loop merges; neither may lose
//! the other's update.

use std::sync::Arc;

use viewmesh_core::{ReplicaId, ReplicaState, VideoId};
use viewmesh_store::{CounterStore, InMemoryCounterStore};

fn rid(name: &str) -> ReplicaId {
    ReplicaId::new(name).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_all_counted() {
    let store = Arc::new(InMemoryCounterStore::new());
    let local = rid("r1");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let local = local.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..100 {
                store.increment(VideoId(42), &local, 1).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.slot(VideoId(42), &local).await.unwrap(), 1_600);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn increments_survive_interleaved_merges() {
    let store = Arc::new(InMemoryCounterStore::new());
    let local = rid("r1");
    let peer = rid("r2");

    let incrementer = {
        let store = store.clone();
        let local = local.clone();
        tokio::spawn(async move {
            for _ in 0..500 {
                store.increment(VideoId(7), &local, 1).await.unwrap();
            }
        })
    };

    let merger = {
        let store = store.clone();
        let peer = peer.clone();
        tokio::spawn(async move {
            for n in 1..=500u64 {
                let remote: ReplicaState = [(VideoId(7), peer.clone(), n)].into_iter().collect();
                store.merge_state(&remote).await.unwrap();
            }
        })
    };

    incrementer.await.unwrap();
    merger.await.unwrap();

    assert_eq!(store.slot(VideoId(7), &local).await.unwrap(), 500);
    assert_eq!(store.slot(VideoId(7), &peer).await.unwrap(), 500);
    assert_eq!(store.total(VideoId(7)).await.unwrap(), 1_000);
}

#[tokio::test]
async fn merge_never_lowers_a_slot() {
    let store = InMemoryCounterStore::new();
    let peer = rid("r2");

    store.merge_slot(VideoId(1), &peer, 9).await.unwrap();
    let value = store.merge_slot(VideoId(1), &peer, 4).await.unwrap();

    assert_eq!(value, 9);
    assert_eq!(store.total(VideoId(1)).await.unwrap(), 9);
}

#[tokio::test]
async fn seeded_store_exposes_restored_state() {
    let restored: ReplicaState = [(VideoId(3), rid("r1"), 4), (VideoId(3), rid("r2"), 6)]
        .into_iter()
        .collect();
    let store = InMemoryCounterStore::with_state(restored.clone());

    assert_eq!(store.snapshot_all().await.unwrap(), restored);
    assert_eq!(store.total(VideoId(3)).await.unwrap(), 10);
}
