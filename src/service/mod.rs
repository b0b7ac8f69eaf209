//! LS Node Graph HTTP Service
//!
//! Acts as the event transport: upstream publishers POST change events and
//! each one is handled synchronously, so the response tells the publisher
//! whether to redeliver.
//!
//! ## Endpoints
//!
//! - `POST /api/events` - Route an event by the collection in its `_id`
//! - `POST /api/events/ls_node` - Node change event
//! - `POST /api/events/ls_link` - Link change event
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use middleware::{record_event_metrics, request_tracking_middleware, REQUEST_ID_HEADER};
pub use routes::{create_router, ErrorResponse, EventResponse};
pub use state::{EventCounters, ServiceState};
pub use telemetry::{init_tracing, LogFormat, DEFAULT_LOG_FILTER};
