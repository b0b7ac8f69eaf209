//! Axum routes for the LS node graph service.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::dispatcher::DispatchOutcome;
use crate::error::SyncError;
use crate::store::DocumentStore;
use crate::types::EventMessage;
use crate::EDGE_SCHEMA_VERSION;

use super::middleware::record_event_metrics;
use super::state::{EventCountersSnapshot, ServiceState};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for a handled event.
#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    /// Key of the record the event referred to.
    #[serde(rename = "_key")]
    pub key: String,
    /// What the synchronizer did.
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

/// Structured error response.
///
/// Carries collection, key and action so a failed event can be diagnosed
/// and replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Collection named by the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Record key of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Action of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            collection: None,
            key: None,
            action: None,
        }
    }

    /// Attach the event the error belongs to.
    pub fn for_event(mut self, event: &EventMessage) -> Self {
        self.collection = Some(event.collection().to_string());
        self.key = Some(event.key.clone());
        self.action = Some(event.action.to_string());
        self
    }
}

/// HTTP status for a synchronization error.
pub fn status_for(error: &SyncError) -> StatusCode {
    match error {
        SyncError::Validation { .. } => StatusCode::BAD_REQUEST,
        SyncError::StaleEvent { .. } => StatusCode::CONFLICT,
        SyncError::Resolution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SyncError::Storage(_) | SyncError::Decode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Edge document schema version.
    pub schema_version: String,
    /// Vertex collection name.
    pub node_collection: String,
    /// Link collection name.
    pub link_collection: String,
    /// Edge collection name.
    pub edge_collection: String,
    /// Event counters since start.
    pub events: EventCountersSnapshot,
    /// Seconds since start.
    pub uptime_secs: i64,
    /// Whether the store answered.
    pub store_connected: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service can take events.
    pub ready: bool,
    /// Store reachability.
    pub store: bool,
    /// Reason when not ready.
    pub details: Option<String>,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Clone, Copy)]
enum Track {
    Node,
    Link,
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn dispatch<S: DocumentStore + 'static>(
    state: &ServiceState<S>,
    track: Track,
    event: EventMessage,
) -> Result<Json<EventResponse>, HandlerError> {
    let start = Instant::now();
    let result = match track {
        Track::Node => state.graph.handle_node_event(&event).await,
        Track::Link => state.graph.handle_link_event(&event).await,
    };
    let latency_ms = start.elapsed().as_millis() as u64;
    let action = event.action.to_string();
    state.counters.record(result.is_ok());

    match result {
        Ok(outcome) => {
            record_event_metrics(event.collection(), &action, "ok", latency_ms);
            Ok(Json(EventResponse {
                key: event.key,
                outcome,
            }))
        }
        Err(e) => {
            record_event_metrics(event.collection(), &action, e.code(), latency_ms);
            tracing::error!(
                collection = %event.collection(),
                key = %event.key,
                action = %event.action,
                error = %e,
                "Failed to process event"
            );
            Err((
                status_for(&e),
                Json(ErrorResponse::new(e.code(), e.to_string()).for_event(&event)),
            ))
        }
    }
}

/// Handle an LS node change event.
async fn node_event_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Json(event): Json<EventMessage>,
) -> Result<Json<EventResponse>, HandlerError> {
    dispatch(&state, Track::Node, event).await
}

/// Handle an LS link change event.
async fn link_event_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Json(event): Json<EventMessage>,
) -> Result<Json<EventResponse>, HandlerError> {
    dispatch(&state, Track::Link, event).await
}

/// Route an event by the collection encoded in its `_id`.
async fn event_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Json(event): Json<EventMessage>,
) -> Result<Json<EventResponse>, HandlerError> {
    let config = state.graph.config();
    let track = if event.collection() == config.node_collection {
        Track::Node
    } else if event.collection() == config.link_collection {
        Track::Link
    } else {
        let error = ErrorResponse::new(
            "UNKNOWN_COLLECTION",
            format!("No handler bound to collection {}", event.collection()),
        )
        .for_event(&event);
        return Err((StatusCode::BAD_REQUEST, Json(error)));
    };
    dispatch(&state, track, event).await
}

/// Health check endpoint (detailed).
async fn health_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<HealthResponse> {
    let store_connected = state.graph.store().is_healthy().await;
    let config = state.graph.config();

    Json(HealthResponse {
        status: if store_connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: EDGE_SCHEMA_VERSION.to_string(),
        node_collection: config.node_collection.clone(),
        link_collection: config.link_collection.clone(),
        edge_collection: config.edge_collection.clone(),
        events: state.counters.snapshot(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        store_connected,
    })
}

/// Liveness probe endpoint. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store is reachable, 503 otherwise.
async fn readiness_handler<S: DocumentStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.graph.store().is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some("Document store unreachable".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the service.
pub fn create_router<S: DocumentStore + 'static>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Event ingress
        .route("/api/events", post(event_handler::<S>))
        .route("/api/events/ls_node", post(node_event_handler::<S>))
        .route("/api/events/ls_link", post(link_event_handler::<S>))
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .with_state(state)
}
