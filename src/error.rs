//! Error types for graph synchronization.

use std::fmt;

use crate::types::Action;

/// Which side of a link an endpoint lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// The advertising (local) node.
    Local,
    /// The neighbor (remote) node.
    Remote,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Why an endpoint lookup did not yield exactly one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// No node in scope.
    NotFound,
    /// More than one node in scope; carries the match count.
    Ambiguous(usize),
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no matching node"),
            Self::Ambiguous(n) => write!(f, "{} matching nodes", n),
        }
    }
}

/// Error type for event handling.
///
/// "Not found" on removal paths never surfaces here; it is treated as a
/// completed removal.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Event names a collection this handler is not bound to.
    #[error("Configured collection {expected} does not match event collection {received}")]
    Validation {
        /// Collection the handler is bound to.
        expected: String,
        /// Collection encoded in the event.
        received: String,
    },
    /// Non-delete action for a record that no longer exists.
    #[error("Document {collection}/{key} not found but action is {action}, possible stale event")]
    StaleEvent {
        /// Source collection.
        collection: String,
        /// Record key.
        key: String,
        /// Action carried by the event.
        action: Action,
    },
    /// Endpoint lookup did not return exactly one node.
    #[error("Failed to resolve {endpoint} node {igp_router_id} for link {link_key}: {failure}")]
    Resolution {
        /// Link being synchronized.
        link_key: String,
        /// Side of the link.
        endpoint: Endpoint,
        /// IGP router ID that was looked up.
        igp_router_id: String,
        /// Lookup result.
        failure: ResolutionFailure,
    },
    /// Backend failure.
    #[error("Store error: {0}")]
    Storage(String),
    /// A stored record could not be decoded.
    #[error("Failed to decode {collection}/{key}: {source}")]
    Decode {
        /// Source collection.
        collection: String,
        /// Record key.
        key: String,
        /// Decoder error.
        source: serde_json::Error,
    },
}

impl SyncError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Storage(e.to_string())
    }

    /// Whether this is an endpoint resolution failure.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "COLLECTION_MISMATCH",
            Self::StaleEvent { .. } => "STALE_EVENT",
            Self::Resolution { failure: ResolutionFailure::NotFound, .. } => "ENDPOINT_NOT_FOUND",
            Self::Resolution { failure: ResolutionFailure::Ambiguous(_), .. } => "ENDPOINT_AMBIGUOUS",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
        }
    }
}

/// Decode a stored document into a typed record.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    collection: &str,
    document: serde_json::Value,
) -> Result<T, SyncError> {
    let key = crate::store::document_key(&document).unwrap_or_default().to_string();
    serde_json::from_value(document).map_err(|source| SyncError::Decode {
        collection: collection.to_string(),
        key,
        source,
    })
}
