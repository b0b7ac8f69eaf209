//! Service middleware for request tracking and metrics.
//!
//! ## Metrics Exposed
//!
//! - `lsnode_graph::metrics` `request` - request count and latency by path, method, status
//! - `lsnode_graph::metrics` `event` - per-event outcome and latency by collection and action

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// Correlation header read from requests and echoed on responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlates, times and records every request.
///
/// The caller's `x-request-id` is reused when present and valid, otherwise
/// a fresh UUID is issued. The handler runs inside a `request` span carrying
/// the ID, and the ID is returned in the response header of the same name.
pub async fn request_tracking_middleware(mut request: Request, next: Next) -> Response {
    let start = Instant::now();

    let existing = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .filter(|value| value.to_str().is_ok_and(|v| !v.is_empty()))
        .cloned();
    let request_id = match existing {
        Some(value) => value,
        None => {
            let generated = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
            request
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), generated.clone());
            generated
        }
    };
    let request_id_str = request_id.to_str().unwrap_or_default().to_string();

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id_str,
        method = %method,
        path = %path,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let mut response = next.run(request).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;
    span.record("status", status);
    span.record("latency_ms", latency_ms);

    info!(
        target: "lsnode_graph::metrics",
        metric_type = "request",
        request_id = %request_id_str,
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency_ms,
        "request_metric"
    );

    response
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), request_id);
    response
}

/// Record the handling of one change event.
///
/// `result` is `"ok"` or the error code of the failure.
pub fn record_event_metrics(collection: &str, action: &str, result: &str, latency_ms: u64) {
    info!(
        target: "lsnode_graph::metrics",
        metric_type = "event",
        collection = collection,
        action = action,
        result = result,
        latency_ms = latency_ms,
        "event_metric"
    );
}
