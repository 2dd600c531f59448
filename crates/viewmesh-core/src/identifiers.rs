//! Identifiers for videos and replicas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ViewMeshError;

/// Integer key identifying a video/post
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub i64);

impl From<i64> for VideoId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VideoId {
    type Err = ViewMeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| ViewMeshError::invalid(format!("Invalid video id {s:?}: {e}")))
    }
}

/// Stable, cluster-unique name of a running replica
///
/// The identity must not change across restarts of the same instance: a
/// renamed replica leaves its old slot behind at its last value and starts
/// a fresh one from zero.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Create a replica identifier, rejecting blank names
    pub fn new(name: impl Into<String>) -> Result<Self, ViewMeshError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ViewMeshError::invalid("Replica id must not be empty"));
        }
        Ok(Self(name))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReplicaId {
    type Error = ViewMeshError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReplicaId> for String {
    fn from(id: ReplicaId) -> Self {
        id.0
    }
}

impl FromStr for ReplicaId {
    type Err = ViewMeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ReplicaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
