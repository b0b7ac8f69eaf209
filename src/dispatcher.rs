//! Event dispatch: one inbound change event → graph mutations.
//!
//! ## Flow per event
//!
//! ```text
//! event ─ collection matches? ─no→ Validation error
//!             │yes
//!         read record by key
//!          ├─ found ──── add/update → link: upsert edge
//!          │                          node: sweep incident links
//!          │             other      → ignored
//!          └─ absent ─── del        → link: remove edge
//!                                     node: remove every edge touching it
//!                        other      → StaleEvent error
//! ```
//!
//! Each call is a self-contained unit of work; redelivery of a failed event
//! is the transport's business.

use std::sync::Arc;

use serde::Serialize;

use crate::cascade::RemovalCascade;
use crate::config::SyncConfig;
use crate::error::{decode, SyncError};
use crate::notify::EdgeNotifier;
use crate::resolver::{scope_filters, EndpointResolver};
use crate::store::{DocumentStore, Filter, Query};
use crate::sync::{EdgeSynchronizer, SyncOutcome};
use crate::types::{Action, EventMessage, LsLink, LsNode};

/// Result of a node sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Links incident to the node.
    pub examined: usize,
    /// Links whose edge was created or updated.
    pub synced: usize,
    /// Links skipped because an endpoint did not resolve.
    pub unresolved: usize,
    /// Links skipped because the stored record could not be decoded.
    pub undecodable: usize,
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Link edge upserted (or skipped for an untracked protocol).
    Edge {
        /// Upsert result.
        result: SyncOutcome,
    },
    /// Node present; incident links re-synchronized.
    Swept(SweepReport),
    /// Record deleted; edges removed.
    Removed {
        /// Number of edge documents removed.
        edges: usize,
    },
    /// Node of an untracked protocol.
    Untracked,
    /// Record present but the action requires nothing.
    Ignored,
}

/// Keeps the edge collection consistent with node and link records.
///
/// The notifier is injected here and shared by every component that removes
/// edges; there is no process-wide notifier.
pub struct GraphSynchronizer<S: DocumentStore> {
    store: Arc<S>,
    config: Arc<SyncConfig>,
    sync: EdgeSynchronizer<S>,
    cascade: RemovalCascade<S>,
}

impl<S: DocumentStore> GraphSynchronizer<S> {
    /// Wire a synchronizer over `store`.
    pub fn new(store: Arc<S>, notifier: Arc<dyn EdgeNotifier>, config: SyncConfig) -> Self {
        let config = Arc::new(config);
        let resolver = EndpointResolver::new(Arc::clone(&store), config.node_collection.clone());
        let cascade = RemovalCascade::new(Arc::clone(&store), notifier, config.edge_collection.clone());
        let sync = EdgeSynchronizer::new(Arc::clone(&store), Arc::clone(&config), resolver, cascade.clone());
        Self {
            store,
            config,
            sync,
            cascade,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle a change event on the link collection.
    pub async fn handle_link_event(&self, event: &EventMessage) -> Result<DispatchOutcome, SyncError> {
        let collection = &self.config.link_collection;
        let Some(link) = self.current_record::<LsLink>(collection, event).await? else {
            let removed = self.cascade.remove_edge_for_link(&event.key, event.action).await?;
            return Ok(DispatchOutcome::Removed {
                edges: usize::from(removed),
            });
        };

        match event.action {
            Action::Add | Action::Update => {
                let result = self.sync.sync_edge(&event.key, &link, event.action).await?;
                Ok(DispatchOutcome::Edge { result })
            }
            _ => Ok(DispatchOutcome::Ignored),
        }
    }

    /// Handle a change event on the node collection.
    pub async fn handle_node_event(&self, event: &EventMessage) -> Result<DispatchOutcome, SyncError> {
        let collection = &self.config.node_collection;
        let Some(node) = self.current_record::<LsNode>(collection, event).await? else {
            let edges = self.cascade.remove_edges_for_node(&event.id, event.action).await?;
            return Ok(DispatchOutcome::Removed { edges });
        };

        match event.action {
            Action::Add | Action::Update => self.sweep_node(&node, event.action).await,
            _ => Ok(DispatchOutcome::Ignored),
        }
    }

    /// Re-synchronize every link with `node` as an endpoint.
    ///
    /// Recovers edges that could not be built while this node was missing.
    /// Links whose other endpoint still does not resolve, and link records
    /// that fail to decode, are skipped and counted; only storage failures
    /// abort the sweep. `action` is the node change being handled.
    pub async fn sweep_node(&self, node: &LsNode, action: Action) -> Result<DispatchOutcome, SyncError> {
        if !self.config.is_tracked(node.protocol_id) {
            tracing::debug!(node_key = %node.key, protocol = %node.protocol_id, "Protocol not graphed, skipping node");
            return Ok(DispatchOutcome::Untracked);
        }

        let query = scope_filters(node.protocol_id, node.domain_id, &node.area_id)
            .into_iter()
            .fold(
                Query::new(&self.config.link_collection).filter_any(vec![
                    Filter::eq("igp_router_id", node.igp_router_id.as_str()),
                    Filter::eq("remote_igp_router_id", node.igp_router_id.as_str()),
                ]),
                Query::filter,
            );
        let links = self.store.query(&query).await.map_err(SyncError::from_store)?;

        let mut report = SweepReport {
            examined: links.len(),
            ..SweepReport::default()
        };
        for document in links {
            let link: LsLink = match decode(&self.config.link_collection, document) {
                Ok(link) => link,
                Err(e) => {
                    tracing::warn!(node_key = %node.key, error = %e, "Skipping undecodable link record");
                    report.undecodable += 1;
                    continue;
                }
            };
            match self.sync.sync_edge(&link.key, &link, action).await {
                Ok(SyncOutcome::Created | SyncOutcome::Updated) => report.synced += 1,
                Ok(SyncOutcome::Skipped) => {}
                Err(e) if e.is_resolution() => {
                    tracing::debug!(node_key = %node.key, link_key = %link.key, error = %e, "Link not yet resolvable");
                    report.unresolved += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(
            node_key = %node.key,
            examined = report.examined,
            synced = report.synced,
            unresolved = report.unresolved,
            undecodable = report.undecodable,
            "Node sweep complete"
        );
        Ok(DispatchOutcome::Swept(report))
    }

    /// Validate the event and fetch the record it refers to.
    ///
    /// `Ok(None)` means the record is gone and the event is a delete.
    async fn current_record<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        event: &EventMessage,
    ) -> Result<Option<T>, SyncError> {
        if event.collection() != collection {
            return Err(SyncError::Validation {
                expected: collection.to_string(),
                received: event.collection().to_string(),
            });
        }
        tracing::debug!(collection, key = %event.key, action = %event.action, "Processing event");

        let document = self
            .store
            .read_document(collection, &event.key)
            .await
            .map_err(SyncError::from_store)?;

        match document {
            Some(document) => decode(collection, document).map(Some),
            None if event.action == Action::Del => Ok(None),
            None => Err(SyncError::StaleEvent {
                collection: collection.to_string(),
                key: event.key.clone(),
                action: event.action,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TestNotifier;
    use crate::store::InMemoryDocumentStore;
    use crate::types::ProtocolId;

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        notifier: Arc<TestNotifier>,
        graph: GraphSynchronizer<InMemoryDocumentStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDocumentStore::new());
        let notifier = Arc::new(TestNotifier::default());
        let graph = GraphSynchronizer::new(Arc::clone(&store), notifier.clone(), SyncConfig::default());
        Fixture { store, notifier, graph }
    }

    fn put_node(store: &InMemoryDocumentStore, key: &str, router: &str) {
        store
            .put("ls_node", key, &LsNode::new(ProtocolId::IsisL2, 1, "", router))
            .unwrap();
    }

    fn put_link(store: &InMemoryDocumentStore, key: &str, local: &str, remote: &str) {
        store
            .put("ls_link", key, &LsLink::new(key, ProtocolId::IsisL2, 1, local, remote))
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_collection_rejected() {
        let f = fixture();
        let event = EventMessage::new("ls_prefix", "p1", Action::Add);

        let err = f.graph.handle_link_event(&event).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation { ref expected, ref received } if expected == "ls_link" && received == "ls_prefix"
        ));

        let err = f.graph.handle_node_event(&EventMessage::new("ls_link", "L1", Action::Add)).await.unwrap_err();
        assert_eq!(err.code(), "COLLECTION_MISMATCH");
    }

    #[tokio::test]
    async fn test_stale_event_on_absent_record() {
        let f = fixture();

        for action in [Action::Add, Action::Update, Action::Other] {
            let err = f
                .graph
                .handle_link_event(&EventMessage::new("ls_link", "L1", action))
                .await
                .unwrap_err();
            assert!(matches!(err, SyncError::StaleEvent { action: a, .. } if a == action));
        }
    }

    #[tokio::test]
    async fn test_stale_event_on_absent_node() {
        let f = fixture();
        put_node(&f.store, "a", "0000.0000.0001");
        put_link(&f.store, "L1", "0000.0000.0001", "0000.0000.0002");

        for action in [Action::Add, Action::Update] {
            let err = f
                .graph
                .handle_node_event(&EventMessage::new("ls_node", "b", action))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                SyncError::StaleEvent { ref collection, ref key, action: a } if collection == "ls_node" && key == "b" && a == action
            ));
            assert_eq!(err.code(), "STALE_EVENT");
        }
        assert_eq!(f.store.count("ls_node_edge"), 0);
        assert!(f.notifier.is_empty());
    }

    #[tokio::test]
    async fn test_link_add_creates_edge() {
        let f = fixture();
        put_node(&f.store, "a", "0000.0000.0001");
        put_node(&f.store, "b", "0000.0000.0002");
        put_link(&f.store, "L1", "0000.0000.0001", "0000.0000.0002");

        let outcome = f.graph.handle_link_event(&EventMessage::new("ls_link", "L1", Action::Add)).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Edge { result: SyncOutcome::Created });
        assert_eq!(f.store.count("ls_node_edge"), 1);
    }

    #[tokio::test]
    async fn test_del_for_present_record_is_ignored() {
        let f = fixture();
        put_node(&f.store, "a", "0000.0000.0001");
        put_node(&f.store, "b", "0000.0000.0002");
        put_link(&f.store, "L1", "0000.0000.0001", "0000.0000.0002");
        f.graph.handle_link_event(&EventMessage::new("ls_link", "L1", Action::Add)).await.unwrap();

        let outcome = f.graph.handle_link_event(&EventMessage::new("ls_link", "L1", Action::Del)).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(f.store.count("ls_node_edge"), 1);

        let outcome = f.graph.handle_node_event(&EventMessage::new("ls_node", "a", Action::Del)).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(f.store.count("ls_node_edge"), 1);
    }

    #[tokio::test]
    async fn test_link_delete_removes_edge_and_notifies() {
        let f = fixture();
        put_node(&f.store, "a", "0000.0000.0001");
        put_node(&f.store, "b", "0000.0000.0002");
        put_link(&f.store, "L1", "0000.0000.0001", "0000.0000.0002");
        f.graph.handle_link_event(&EventMessage::new("ls_link", "L1", Action::Add)).await.unwrap();

        f.store.delete("ls_link", "L1");
        let del = EventMessage::new("ls_link", "L1", Action::Del);
        assert_eq!(f.graph.handle_link_event(&del).await.unwrap(), DispatchOutcome::Removed { edges: 1 });
        assert_eq!(f.store.count("ls_node_edge"), 0);
        assert_eq!(f.notifier.keys(), vec!["L1"]);

        // Redelivery is harmless.
        assert_eq!(f.graph.handle_link_event(&del).await.unwrap(), DispatchOutcome::Removed { edges: 0 });
        assert_eq!(f.notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_node_add_sweeps_both_directions() {
        let f = fixture();
        put_node(&f.store, "a", "0000.0000.0001");
        put_node(&f.store, "c", "0000.0000.0003");
        put_link(&f.store, "L-ab", "0000.0000.0001", "0000.0000.0002");
        put_link(&f.store, "L-ba", "0000.0000.0002", "0000.0000.0001");
        put_link(&f.store, "L-bx", "0000.0000.0002", "0000.0000.0009");
        put_link(&f.store, "L-ac", "0000.0000.0001", "0000.0000.0003");

        put_node(&f.store, "b", "0000.0000.0002");
        let outcome = f.graph.handle_node_event(&EventMessage::new("ls_node", "b", Action::Add)).await.unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Swept(SweepReport {
                examined: 3,
                synced: 2,
                unresolved: 1,
                undecodable: 0,
            })
        );
        assert!(f.store.get("ls_node_edge", "L-ab").is_some());
        assert!(f.store.get("ls_node_edge", "L-ba").is_some());
        assert!(f.store.get("ls_node_edge", "L-bx").is_none());
        assert!(f.store.get("ls_node_edge", "L-ac").is_none());
    }

    #[tokio::test]
    async fn test_undecodable_link_does_not_abort_sweep() {
        let f = fixture();
        put_node(&f.store, "a", "0000.0000.0001");
        put_link(&f.store, "L1", "0000.0000.0001", "0000.0000.0002");

        let mut broken =
            serde_json::to_value(LsLink::new("L0", ProtocolId::IsisL2, 1, "0000.0000.0002", "0000.0000.0001")).unwrap();
        broken.as_object_mut().unwrap().remove("remote_igp_router_id");
        f.store.put("ls_link", "L0", &broken).unwrap();

        put_node(&f.store, "b", "0000.0000.0002");
        let outcome = f.graph.handle_node_event(&EventMessage::new("ls_node", "b", Action::Add)).await.unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Swept(SweepReport {
                examined: 2,
                synced: 1,
                unresolved: 0,
                undecodable: 1,
            })
        );
        assert_eq!(f.store.count("ls_node_edge"), 1);
        assert!(f.store.get("ls_node_edge", "L1").is_some());
    }

    #[tokio::test]
    async fn test_untracked_node_not_swept() {
        let f = fixture();
        f.store
            .put("ls_node", "bgp", &LsNode::new(ProtocolId::Bgp, 0, "", "10.0.0.1"))
            .unwrap();

        let outcome = f.graph.handle_node_event(&EventMessage::new("ls_node", "bgp", Action::Add)).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Untracked);
    }

    #[tokio::test]
    async fn test_node_delete_cascades() {
        let f = fixture();
        put_node(&f.store, "a", "0000.0000.0001");
        put_node(&f.store, "b", "0000.0000.0002");
        put_link(&f.store, "L1", "0000.0000.0001", "0000.0000.0002");
        put_link(&f.store, "L2", "0000.0000.0002", "0000.0000.0001");
        f.graph.handle_node_event(&EventMessage::new("ls_node", "b", Action::Add)).await.unwrap();
        assert_eq!(f.store.count("ls_node_edge"), 2);

        f.store.delete("ls_node", "a");
        let outcome = f.graph.handle_node_event(&EventMessage::new("ls_node", "a", Action::Del)).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Removed { edges: 2 });
        assert_eq!(f.store.count("ls_node_edge"), 0);
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let f = fixture();
        f.store.fail_collection("ls_link");

        let err = f
            .graph
            .handle_link_event(&EventMessage::new("ls_link", "L1", Action::Del))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
    }

    #[tokio::test]
    async fn test_outcome_serialization() {
        let json = serde_json::to_value(DispatchOutcome::Removed { edges: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "removed", "edges": 3}));

        let json = serde_json::to_value(DispatchOutcome::Edge { result: SyncOutcome::Created }).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "edge", "result": "created"}));
    }
}
