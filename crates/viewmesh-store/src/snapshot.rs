//! Counter snapshot persistence
//!
//! A snapshot is the JSON encoding of a [`ReplicaState`]. Restoring one is
//! a plain join into the live store, so a stale or partial snapshot can
//! never lower a slot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;

use viewmesh_core::{ReplicaState, Result, ViewMeshError};

/// Load a saved state; a missing file yields an empty state
pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<ReplicaState> {
    let path = path.as_ref();
    let state: Option<ReplicaState> = read_json_file(path).await?;
    match state {
        Some(state) => {
            tracing::debug!(
                path = %path.display(),
                slots = state.slot_count(),
                "Loaded counter snapshot"
            );
            Ok(state)
        }
        None => {
            tracing::debug!(path = %path.display(), "No counter snapshot found");
            Ok(ReplicaState::new())
        }
    }
}

/// Persist `state` to `path`, replacing any previous snapshot atomically
pub async fn save_snapshot(path: impl AsRef<Path>, state: &ReplicaState) -> Result<()> {
    write_json_atomically(path.as_ref(), state).await
}

pub(crate) async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ViewMeshError::store_unavailable(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        ViewMeshError::store_unavailable(format!("corrupt file {}: {e}", path.display()))
    })
}

pub(crate) async fn write_json_atomically<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| ViewMeshError::store_unavailable(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Unique sibling temp path, so overlapping writers never share a file
fn temp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);

    let seq = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewmesh_core::{ReplicaId, VideoId};

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_snapshot(dir.path().join("absent.json")).await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let r1 = ReplicaId::new("r1").unwrap();
        let state: ReplicaState = [(VideoId(42), r1.clone(), 3)].into_iter().collect();

        save_snapshot(&path, &state).await.unwrap();
        let loaded = load_snapshot(&path).await.unwrap();

        assert_eq!(loaded, state);

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_temp_paths_are_unique() {
        let path = Path::new("/var/lib/viewmesh/state.json");
        let first = temp_path(path);
        let second = temp_path(path);

        assert_ne!(first, second);
        assert_eq!(first.parent(), path.parent());
    }

    #[tokio::test]
    async fn test_overlapping_saves_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let r1 = ReplicaId::new("r1").unwrap();
        let older: ReplicaState = [(VideoId(1), r1.clone(), 1)].into_iter().collect();
        let newer: ReplicaState = [(VideoId(1), r1, 2)].into_iter().collect();

        let (a, b) = tokio::join!(save_snapshot(&path, &older), save_snapshot(&path, &newer));
        a.unwrap();
        b.unwrap();

        let loaded = load_snapshot(&path).await.unwrap();
        assert!(loaded == older || loaded == newer);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = load_snapshot(&path).await.unwrap_err();
        assert_eq!(err.code(), "store_unavailable");
    }
}
