//! # lsnode-graph
//!
//! Keeps a link-state topology graph in sync with a stream of change events.
//!
//! Node records (`ls_node`) are the vertices and link records (`ls_link`)
//! describe unidirectional adjacencies between them. Both are owned by an
//! upstream ingestion pipeline. This crate derives the edge collection
//! (`ls_node_edge`) from them and keeps it consistent as records come and go.
//!
//! ## Architecture
//!
//! ```text
//! EventMessage → GraphSynchronizer ─┬→ EdgeSynchronizer → EndpointResolver
//!                                   │          ↓
//!                                   └→ RemovalCascade → EdgeNotifier
//!                                              ↓
//!                                DocumentStore (Postgres or Memory)
//! ```
//!
//! ## Consistency Guarantees
//!
//! - An edge exists iff its link exists and both endpoint nodes resolve
//! - Edge key = link key, so every edge has exactly one source link
//! - Replayed or reordered events converge to the same edge collection
//! - Resolution never guesses: zero or several candidate nodes is an error

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod key;
pub mod store;
pub mod resolver;
pub mod sync;
pub mod cascade;
pub mod dispatcher;
pub mod notify;
pub mod config;
pub mod error;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    ProtocolId, LsNode, LsPrefix, MultiTopologyId, LsLink, AdjacencySid, EndXSid,
    LsNodeEdge, EventMessage, Action,
};
pub use key::{node_key, prefix_key, link_key};
pub use store::{
    DocumentStore, InMemoryDocumentStore, Query, Filter,
    CreateOutcome, UpdateOutcome, RemoveOutcome,
};
#[cfg(feature = "postgres")]
pub use store::PostgresDocumentStore;
pub use resolver::{EndpointResolver, Resolution};
pub use sync::{EdgeSynchronizer, SyncOutcome};
pub use cascade::RemovalCascade;
pub use dispatcher::{GraphSynchronizer, DispatchOutcome, SweepReport};
pub use notify::{EdgeNotifier, EdgeNotification, LogNotifier, ChannelNotifier, NoOpNotifier, TestNotifier};
pub use config::SyncConfig;
pub use error::{SyncError, Endpoint, ResolutionFailure};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

/// Schema version of the edge documents written by this crate.
pub const EDGE_SCHEMA_VERSION: &str = "1.0.0";
