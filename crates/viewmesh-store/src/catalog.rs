//! Video display names for operator diagnostics

use std::collections::BTreeMap;

use async_trait::async_trait;

use viewmesh_core::VideoId;

/// Lookup of human-readable video names
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Display name for `video`, `None` when the catalog has no entry
    async fn display_name(&self, video: VideoId) -> Option<String>;
}

/// Catalog backed by a fixed id-to-name table
#[derive(Debug, Clone, Default)]
pub struct StaticVideoCatalog {
    names: BTreeMap<VideoId, String>,
}

impl StaticVideoCatalog {
    /// Create a catalog from an id-to-name table
    pub fn new(names: BTreeMap<VideoId, String>) -> Self {
        Self { names }
    }

    /// Number of named videos
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(VideoId, String)> for StaticVideoCatalog {
    fn from_iter<I: IntoIterator<Item = (VideoId, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl VideoCatalog for StaticVideoCatalog {
    async fn display_name(&self, video: VideoId) -> Option<String> {
        self.names.get(&video).cloned()
    }
}
