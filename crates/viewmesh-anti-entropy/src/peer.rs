//! Peer state fetching
//!
//! The pull loop talks to peers only through [`PeerClient`], so tests can
//! swap the HTTP transport for scripted responses.

use std::time::Duration;

use async_trait::async_trait;

use viewmesh_core::{decode_sync_message, Result, SyncMessage, ViewMeshError};

/// Path of the state exchange endpoint on every replica
pub const STATE_PATH: &str = "/internal/views/state";

/// Fetches a peer's full counter state
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetch the current [`SyncMessage`] from the peer at base URL `peer`
    ///
    /// Transport failures, timeouts and non-success statuses surface as
    /// `PeerUnreachable`; an undecodable body as `MalformedPayload`.
    async fn fetch_state(&self, peer: &str) -> Result<SyncMessage>;
}

/// Build the state URL for a peer base URL
pub fn state_url(peer: &str) -> String {
    format!("{}{STATE_PATH}", peer.trim_end_matches('/'))
}

/// [`PeerClient`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    /// Create a client whose requests are bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ViewMeshError::invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_state(&self, peer: &str) -> Result<SyncMessage> {
        let url = state_url(peer);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ViewMeshError::peer_unreachable(peer, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ViewMeshError::peer_unreachable(
                peer,
                format!("unexpected status {}", response.status()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ViewMeshError::peer_unreachable(peer, e.to_string()))?;
        decode_sync_message(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_url_trims_trailing_slash() {
        assert_eq!(
            state_url("http://10.0.0.2:8080/"),
            "http://10.0.0.2:8080/internal/views/state"
        );
        assert_eq!(
            state_url("http://replica-b"),
            "http://replica-b/internal/views/state"
        );
    }

    #[tokio::test]
    async fn test_closed_port_is_peer_unreachable() {
        let client = HttpPeerClient::new(Duration::from_millis(500)).unwrap();
        let err = client.fetch_state("http://127.0.0.1:1").await.unwrap_err();
        assert_eq!(err.code(), "peer_unreachable");
    }
}
