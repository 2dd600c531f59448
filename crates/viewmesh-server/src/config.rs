//! Replica configuration
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML or
//! JSON file, `VIEWMESH_*` environment variables, then command-line flags
//! applied by the binary.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use viewmesh_anti_entropy::AntiEntropyConfig;
use viewmesh_core::{ReplicaId, Result, VideoId, ViewMeshError};
use viewmesh_store::StaticVideoCatalog;

/// Environment variable for the replica identity
pub const ENV_REPLICA_ID: &str = "VIEWMESH_REPLICA_ID";
/// Environment variable for the comma-separated peer base URLs
pub const ENV_PEER_URLS: &str = "VIEWMESH_PEER_URLS";
/// Environment variable for the HTTP listen address
pub const ENV_LISTEN_ADDR: &str = "VIEWMESH_LISTEN_ADDR";
/// Environment variable for the pull period in milliseconds
pub const ENV_PULL_INTERVAL_MS: &str = "VIEWMESH_PULL_INTERVAL_MS";
/// Environment variable for the flush period in milliseconds
pub const ENV_FLUSH_INTERVAL_MS: &str = "VIEWMESH_FLUSH_INTERVAL_MS";
/// Environment variable for the peer fetch timeout in milliseconds
pub const ENV_PEER_TIMEOUT_MS: &str = "VIEWMESH_PEER_TIMEOUT_MS";

/// Configuration for one replica process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaConfig {
    /// Stable, unique name of this replica
    pub replica_id: String,
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Peer base URLs; empty disables the pull loop
    pub peer_urls: Vec<String>,
    /// Pull period in milliseconds
    pub pull_interval_ms: u64,
    /// Flush period in milliseconds
    pub flush_interval_ms: u64,
    /// Bound on one peer fetch in milliseconds
    pub peer_timeout_ms: u64,
    /// JSON file backing the aggregate store; in-memory when unset
    pub aggregate_path: Option<PathBuf>,
    /// JSON file the counter snapshot is saved to and restored from
    pub snapshot_path: Option<PathBuf>,
    /// Video id to display name, used by the replica table
    pub videos: BTreeMap<String, String>,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        let defaults = AntiEntropyConfig::default();
        Self {
            replica_id: String::new(),
            listen_addr: "0.0.0.0:8080".to_string(),
            peer_urls: Vec::new(),
            pull_interval_ms: defaults.pull_interval.as_millis() as u64,
            flush_interval_ms: defaults.flush_interval.as_millis() as u64,
            peer_timeout_ms: defaults.peer_timeout.as_millis() as u64,
            aggregate_path: None,
            snapshot_path: None,
            videos: BTreeMap::new(),
        }
    }
}

impl ReplicaConfig {
    /// Load a configuration file, choosing the format by extension
    ///
    /// `.json` files are parsed as JSON, everything else as TOML. Missing
    /// keys keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ViewMeshError::invalid(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| ViewMeshError::invalid(format!("Invalid JSON config: {e}")))
        } else {
            toml::from_str(&content)
                .map_err(|e| ViewMeshError::invalid(format!("Invalid TOML config: {e}")))
        }
    }

    /// Overlay `VIEWMESH_*` environment variables
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from an arbitrary lookup
    pub fn merge_with_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup(ENV_REPLICA_ID) {
            self.replica_id = id;
        }
        if let Some(peers) = lookup(ENV_PEER_URLS) {
            self.peer_urls = parse_peer_list(&peers);
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.listen_addr = addr;
        }
        if let Some(ms) = lookup(ENV_PULL_INTERVAL_MS) {
            self.pull_interval_ms = parse_millis(ENV_PULL_INTERVAL_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_FLUSH_INTERVAL_MS) {
            self.flush_interval_ms = parse_millis(ENV_FLUSH_INTERVAL_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_PEER_TIMEOUT_MS) {
            self.peer_timeout_ms = parse_millis(ENV_PEER_TIMEOUT_MS, &ms)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.replica()?;
        self.socket_addr()?;
        self.catalog()?;
        self.anti_entropy().validate()
    }

    /// Replica identity
    pub fn replica(&self) -> Result<ReplicaId> {
        ReplicaId::new(self.replica_id.trim())
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr.parse().map_err(|e| {
            ViewMeshError::invalid(format!("Invalid listen address {}: {e}", self.listen_addr))
        })
    }

    /// Scheduler settings derived from this configuration
    pub fn anti_entropy(&self) -> AntiEntropyConfig {
        AntiEntropyConfig {
            peers: self.peer_urls.clone(),
            pull_interval: Duration::from_millis(self.pull_interval_ms),
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            peer_timeout: Duration::from_millis(self.peer_timeout_ms),
        }
    }

    /// Video catalog built from the `videos` table
    pub fn catalog(&self) -> Result<StaticVideoCatalog> {
        self.videos
            .iter()
            .map(|(id, name)| Ok((id.trim().parse::<VideoId>()?, name.clone())))
            .collect()
    }
}

/// Split a comma-separated peer list, dropping blanks
pub fn parse_peer_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(String::from)
        .collect()
}

fn parse_millis(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|e| ViewMeshError::invalid(format!("{key} must be a number of milliseconds: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReplicaConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.pull_interval_ms, 10_000);
        assert_eq!(config.flush_interval_ms, 30_000);
        assert_eq!(config.peer_timeout_ms, 5_000);
        assert!(config.catalog().unwrap().is_empty());
        // A replica identity must be configured explicitly.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ReplicaConfig::default();
        config
            .merge_with_vars(vars(&[
                (ENV_REPLICA_ID, "replica-a"),
                (ENV_PEER_URLS, " http://b:8080 , ,http://c:8080"),
                (ENV_PULL_INTERVAL_MS, "2000"),
                (ENV_PEER_TIMEOUT_MS, "500"),
            ]))
            .unwrap();

        assert_eq!(config.replica_id, "replica-a");
        assert_eq!(config.peer_urls, vec!["http://b:8080", "http://c:8080"]);
        assert_eq!(config.pull_interval_ms, 2_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_peer_list_disables_pull() {
        let mut config = ReplicaConfig::default();
        config
            .merge_with_vars(vars(&[(ENV_REPLICA_ID, "r1"), (ENV_PEER_URLS, "")]))
            .unwrap();
        assert!(!config.anti_entropy().pull_enabled());
    }

    #[test]
    fn test_rejects_non_numeric_interval() {
        let mut config = ReplicaConfig::default();
        let err = config
            .merge_with_vars(vars(&[(ENV_FLUSH_INTERVAL_MS, "soon")]))
            .unwrap_err();
        assert_eq!(err.code(), "invalid");
    }

    #[test]
    fn test_rejects_timeout_not_shorter_than_pull() {
        let config = ReplicaConfig {
            replica_id: "r1".into(),
            peer_urls: vec!["http://peer:8080".into()],
            pull_interval_ms: 1_000,
            peer_timeout_ms: 1_000,
            ..ReplicaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_video_key() {
        let config = ReplicaConfig {
            replica_id: "r1".into(),
            videos: [("intro".to_string(), "Intro".to_string())].into_iter().collect(),
            ..ReplicaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("replica.toml");
        std::fs::write(
            &toml_path,
            "replica_id = \"r1\"\npeer_urls = [\"http://r2:8080\"]\n\n[videos]\n42 = \"Launch\"\n",
        )
        .unwrap();
        let config = ReplicaConfig::load_from_file(&toml_path).unwrap();
        assert_eq!(config.replica_id, "r1");
        assert_eq!(config.flush_interval_ms, 30_000);
        assert_eq!(config.catalog().unwrap().len(), 1);

        let json_path = dir.path().join("replica.json");
        std::fs::write(&json_path, r#"{"replica_id":"r2","pull_interval_ms":500}"#).unwrap();
        let config = ReplicaConfig::load_from_file(&json_path).unwrap();
        assert_eq!(config.replica_id, "r2");
        assert_eq!(config.pull_interval_ms, 500);
    }
}
