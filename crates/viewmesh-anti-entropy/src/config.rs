//! Anti-entropy scheduler configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use viewmesh_core::{Result, ViewMeshError};

/// Default pull period
pub const DEFAULT_PULL_INTERVAL: Duration = Duration::from_millis(10_000);
/// Default flush period
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(30_000);
/// Default bound on a single peer fetch
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Timing and peer set for the two anti-entropy loops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiEntropyConfig {
    /// Base URLs of the peers to pull from; empty disables the pull loop
    pub peers: Vec<String>,
    /// Period of the pull loop
    pub pull_interval: Duration,
    /// Period of the flush loop
    pub flush_interval: Duration,
    /// Bound on a single peer state fetch
    pub peer_timeout: Duration,
}

impl Default for AntiEntropyConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            pull_interval: DEFAULT_PULL_INTERVAL,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }
}

impl AntiEntropyConfig {
    /// Short periods for tests
    pub fn for_testing() -> Self {
        Self {
            peers: Vec::new(),
            pull_interval: Duration::from_millis(50),
            flush_interval: Duration::from_millis(50),
            peer_timeout: Duration::from_millis(25),
        }
    }

    /// Replace the peer list
    pub fn with_peers(mut self, peers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the pull loop should run at all
    pub fn pull_enabled(&self) -> bool {
        !self.peers.is_empty()
    }

    /// Check that the loops can be scheduled
    pub fn validate(&self) -> Result<()> {
        if self.pull_interval.is_zero() {
            return Err(ViewMeshError::invalid("pull interval must be greater than zero"));
        }
        if self.flush_interval.is_zero() {
            return Err(ViewMeshError::invalid("flush interval must be greater than zero"));
        }
        if self.peer_timeout.is_zero() {
            return Err(ViewMeshError::invalid("peer timeout must be greater than zero"));
        }
        if self.pull_enabled() && self.peer_timeout >= self.pull_interval {
            return Err(ViewMeshError::invalid(format!(
                "peer timeout ({}ms) must be shorter than the pull interval ({}ms)",
                self.peer_timeout.as_millis(),
                self.pull_interval.as_millis()
            )));
        }
        for peer in &self.peers {
            if !(peer.starts_with("http://") || peer.starts_with("https://")) {
                return Err(ViewMeshError::invalid(format!(
                    "peer URL must start with http:// or https://: {peer}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AntiEntropyConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.pull_enabled());
        assert_eq!(config.pull_interval, Duration::from_secs(10));
        assert_eq!(config.flush_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_testing_config_with_peers_is_valid() {
        let config = AntiEntropyConfig::for_testing().with_peers(["http://127.0.0.1:9001"]);
        assert!(config.validate().is_ok());
        assert!(config.pull_enabled());
    }

    #[test]
    fn test_timeout_must_be_shorter_than_pull_interval() {
        let mut config = AntiEntropyConfig::default().with_peers(["http://peer:8080"]);
        config.peer_timeout = config.pull_interval;
        assert_eq!(config.validate().unwrap_err().code(), "invalid");
    }

    #[test]
    fn test_rejects_non_http_peer() {
        let config = AntiEntropyConfig::default().with_peers(["peer:8080"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = AntiEntropyConfig {
            flush_interval: Duration::ZERO,
            ..AntiEntropyConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
