//! Durable aggregate totals
//!
//! The aggregate store is a cached projection of the live counters for
//! read paths that cannot query the counter store (for example a page load
//! right after a restart). It is never authoritative.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use viewmesh_core::{Counter, Result, VideoId};

use crate::snapshot::{read_json_file, write_json_atomically};

/// Durable per-video view totals
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Upsert the persisted total for `video`
    async fn set_views_count(&self, video: VideoId, total: Counter) -> Result<()>;

    /// Upsert several totals, returning one outcome per entry in order
    ///
    /// Backends that persist the whole table at once override this so a
    /// flush round costs a single write.
    async fn set_views_counts(&self, totals: &[(VideoId, Counter)]) -> Vec<Result<()>> {
        let mut outcomes = Vec::with_capacity(totals.len());
        for &(video, total) in totals {
            outcomes.push(self.set_views_count(video, total).await);
        }
        outcomes
    }

    /// Last persisted total for `video`, if any
    async fn views_count(&self, video: VideoId) -> Result<Option<Counter>>;
}

/// Aggregate store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryAggregateStore {
    totals: RwLock<BTreeMap<VideoId, Counter>>,
}

impl InMemoryAggregateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every persisted total
    pub fn totals(&self) -> BTreeMap<VideoId, Counter> {
        self.totals.read().clone()
    }
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn set_views_count(&self, video: VideoId, total: Counter) -> Result<()> {
        self.totals.write().insert(video, total);
        Ok(())
    }

    async fn views_count(&self, video: VideoId) -> Result<Option<Counter>> {
        Ok(self.totals.read().get(&video).copied())
    }
}

/// Aggregate store persisted as a JSON object keyed by video id
///
/// Every upsert rewrites the file through a temp file and rename, so a
/// crash mid-write leaves the previous version intact. The in-memory table
/// only ever holds what was last written successfully.
#[derive(Debug)]
pub struct FileAggregateStore {
    path: PathBuf,
    totals: Mutex<BTreeMap<VideoId, Counter>>,
}

impl FileAggregateStore {
    /// Open the store at `path`, loading existing totals when the file exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let totals = read_json_file(&path).await?.unwrap_or_default();
        Ok(Self {
            path,
            totals: Mutex::new(totals),
        })
    }

    /// Write `updates` over a copy of the table, committing it once on disk
    ///
    /// A failed or cancelled write leaves memory untouched, so the next
    /// upsert of the same totals writes them again.
    async fn upsert(&self, updates: &[(VideoId, Counter)]) -> Result<()> {
        let mut totals = self.totals.lock().await;
        let mut next = totals.clone();
        next.extend(updates.iter().copied());
        if next == *totals {
            return Ok(());
        }
        write_json_atomically(&self.path, &next).await?;
        *totals = next;
        Ok(())
    }
}

#[async_trait]
impl AggregateStore for FileAggregateStore {
    async fn set_views_count(&self, video: VideoId, total: Counter) -> Result<()> {
        self.upsert(&[(video, total)]).await
    }

    async fn set_views_counts(&self, totals: &[(VideoId, Counter)]) -> Vec<Result<()>> {
        let outcome = self.upsert(totals).await;
        vec![outcome; totals.len()]
    }

    async fn views_count(&self, video: VideoId) -> Result<Option<Counter>> {
        Ok(self.totals.lock().await.get(&video).copied())
    }
}
