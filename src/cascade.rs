//! Edge removal: per link, and cascading per node.

use std::sync::Arc;

use crate::error::SyncError;
use crate::notify::{EdgeNotification, EdgeNotifier};
use crate::store::{document_key, DocumentStore, Filter, Query, RemoveOutcome};
use crate::types::Action;

/// Removes edge documents and reports each removal.
///
/// A missing edge is never an error: events are redelivered, cascades race
/// with other deletions, and some edges were never created because an
/// endpoint was missing.
pub struct RemovalCascade<S: DocumentStore> {
    store: Arc<S>,
    notifier: Arc<dyn EdgeNotifier>,
    edge_collection: String,
}

impl<S: DocumentStore> RemovalCascade<S> {
    /// Create a cascade over `edge_collection`.
    pub fn new(store: Arc<S>, notifier: Arc<dyn EdgeNotifier>, edge_collection: impl Into<String>) -> Self {
        Self {
            store,
            notifier,
            edge_collection: edge_collection.into(),
        }
    }

    /// Remove the edge derived from `link_key`. Returns whether an edge existed.
    pub async fn remove_edge_for_link(&self, link_key: &str, action: Action) -> Result<bool, SyncError> {
        self.remove_edge(link_key, action).await
    }

    /// Query selecting every edge with `node_id` as either endpoint.
    pub fn node_edges_query(&self, node_id: &str) -> Query {
        Query::new(&self.edge_collection).filter_any(vec![
            Filter::eq("_from", node_id),
            Filter::eq("_to", node_id),
        ])
    }

    /// Remove every edge referencing `node_id` (a node document ID).
    ///
    /// Every matched edge is attempted even if an earlier delete fails; the
    /// first failure is returned once the sweep is done. Returns the number
    /// of edges removed.
    pub async fn remove_edges_for_node(&self, node_id: &str, action: Action) -> Result<usize, SyncError> {
        let edges = self
            .store
            .query(&self.node_edges_query(node_id))
            .await
            .map_err(SyncError::from_store)?;

        let mut removed = 0;
        let mut first_error = None;
        for edge in &edges {
            let Some(key) = document_key(edge) else {
                tracing::warn!(node_id, "Skipping edge without _key");
                continue;
            };
            tracing::debug!(collection = %self.edge_collection, key, node_id, "Removing edge of deleted node");
            match self.remove_edge(key, action).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(key, node_id, error = %e, "Failed to remove edge, continuing cascade");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    async fn remove_edge(&self, key: &str, action: Action) -> Result<bool, SyncError> {
        let outcome = self
            .store
            .remove_document(&self.edge_collection, key)
            .await
            .map_err(SyncError::from_store)?;

        match outcome {
            RemoveOutcome::Removed(document) => {
                self.notifier
                    .notify(EdgeNotification::removed(&self.edge_collection, key, document, action));
                Ok(true)
            }
            RemoveOutcome::NotFound => {
                tracing::debug!(collection = %self.edge_collection, key, "Edge already absent");
                Ok(false)
            }
        }
    }
}

impl<S: DocumentStore> Clone for RemovalCascade<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            edge_collection: self.edge_collection.clone(),
        }
    }
}
