//! HTTP surface of a replica
//!
//! Internal endpoints (`/internal/views/*`) carry replica-to-replica state
//! exchange and are unauthenticated. The view-event and read endpoints are
//! the hooks user-facing request handlers call into.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use viewmesh_anti_entropy::{replica_table, SyncMetrics, SyncMetricsSnapshot};
use viewmesh_core::{
    decode_sync_message, Counter, ReplicaId, ReplicaViewRow, SyncMessage, VideoId, VideoViews,
    ViewMeshError,
};
use viewmesh_store::{CounterStore, VideoCatalog};

/// Shared state for the axum handlers
#[derive(Clone)]
pub struct AppState {
    /// Identity of this replica
    pub replica: ReplicaId,
    /// Live counter store
    pub store: Arc<dyn CounterStore>,
    /// Video names for the replica table
    pub catalog: Arc<dyn VideoCatalog>,
    /// Sync metrics shared with the scheduler
    pub metrics: Arc<SyncMetrics>,
    /// Configured peer base URLs
    pub peers: Arc<[String]>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("replica", &self.replica)
            .field("peers", &self.peers)
            .finish_non_exhaustive()
    }
}

/// Build the replica router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/internal/views/state", get(get_state))
        .route("/internal/views/sync", post(receive_sync))
        .route("/internal/views/metrics", get(get_metrics))
        .route("/videos/:video_id/view", post(record_view))
        .route("/videos/:video_id/views", get(get_views))
        .route("/views/replica-table", get(get_replica_table))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// JSON error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code
    pub error: String,
    /// Human-readable message
    pub message: String,
}

/// Handler error mapped onto an HTTP status
#[derive(Debug)]
pub struct ApiError(ViewMeshError);

impl From<ViewMeshError> for ApiError {
    fn from(err: ViewMeshError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ViewMeshError::InvalidDelta { .. }
            | ViewMeshError::MalformedPayload { .. }
            | ViewMeshError::Invalid { .. } => StatusCode::BAD_REQUEST,
            ViewMeshError::CounterOverflow { .. } => StatusCode::CONFLICT,
            ViewMeshError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
            ViewMeshError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorBody {
            error: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Full local state for peers to pull
async fn get_state(State(state): State<AppState>) -> ApiResult<Json<SyncMessage>> {
    let snapshot = state.store.snapshot_all().await?;
    Ok(Json(SyncMessage::new(snapshot, state.replica.clone())))
}

/// Merge a pushed state
///
/// The body is decoded before anything touches the store, so a malformed
/// payload is rejected without a partial merge.
async fn receive_sync(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    let message = match decode_sync_message(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Rejected malformed sync payload");
            state.metrics.record_inbound_rejected();
            return Err(e.into());
        }
    };

    let outcome = state.store.merge_state(&message.video_views).await?;
    state.metrics.record_inbound_accepted(outcome.slots_advanced);
    info!(
        origin = %message.origin(),
        slots = outcome.slots_seen,
        advanced = outcome.slots_advanced,
        "Merged pushed state"
    );
    Ok(StatusCode::OK)
}

/// Count one view against this replica's slot
async fn record_view(
    State(state): State<AppState>,
    Path(video): Path<VideoId>,
) -> ApiResult<Json<Counter>> {
    let value = state.store.increment(video, &state.replica, 1).await?;
    Ok(Json(value))
}

/// Live total for a video
async fn get_views(
    State(state): State<AppState>,
    Path(video): Path<VideoId>,
) -> ApiResult<Json<VideoViews>> {
    let views = state.store.total(video).await?;
    Ok(Json(VideoViews {
        video_id: video,
        views,
    }))
}

/// Per-replica contribution table
async fn get_replica_table(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ReplicaViewRow>>> {
    let rows = replica_table(state.store.as_ref(), state.catalog.as_ref()).await?;
    Ok(Json(rows))
}

/// Metrics endpoint payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Identity of the reporting replica
    pub replica_id: ReplicaId,
    /// Configured peers
    pub peers: Vec<String>,
    /// Counter snapshot
    pub metrics: SyncMetricsSnapshot,
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    Json(MetricsReport {
        replica_id: state.replica.clone(),
        peers: state.peers.to_vec(),
        metrics: state.metrics.snapshot(),
    })
}
