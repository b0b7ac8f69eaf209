//! Edge upsert: link record → edge document.
//!
//! Creation is attempted first; a conflict means the edge already exists and
//! is replaced with the freshly built document. Replayed `add` events and
//! `update` events therefore converge on the same edge no matter how they
//! are ordered, as long as both endpoints resolve.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::cascade::RemovalCascade;
use crate::config::SyncConfig;
use crate::error::{Endpoint, SyncError};
use crate::resolver::EndpointResolver;
use crate::store::{CreateOutcome, DocumentStore, UpdateOutcome};
use crate::types::{Action, LsLink, LsNodeEdge};

/// Create/update rounds before an upsert gives up.
const UPSERT_ATTEMPTS: usize = 3;

/// What [`EdgeSynchronizer::sync_edge`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// A new edge document was written.
    Created,
    /// The existing edge document was replaced.
    Updated,
    /// The link's protocol is not graphed.
    Skipped,
}

/// Builds and upserts edge documents for links.
pub struct EdgeSynchronizer<S: DocumentStore> {
    store: Arc<S>,
    config: Arc<SyncConfig>,
    resolver: EndpointResolver<S>,
    cascade: RemovalCascade<S>,
}

impl<S: DocumentStore> EdgeSynchronizer<S> {
    /// Create a synchronizer.
    pub fn new(
        store: Arc<S>,
        config: Arc<SyncConfig>,
        resolver: EndpointResolver<S>,
        cascade: RemovalCascade<S>,
    ) -> Self {
        Self {
            store,
            config,
            resolver,
            cascade,
        }
    }

    /// Create or update the edge for `link`, keyed by `link_key`.
    ///
    /// If either endpoint cannot be resolved no edge is written, any edge
    /// left over from an earlier resolution is removed, and the resolution
    /// error is returned. `action` is the change that triggered the sync and
    /// is carried on the removal notification.
    pub async fn sync_edge(
        &self,
        link_key: &str,
        link: &LsLink,
        action: Action,
    ) -> Result<SyncOutcome, SyncError> {
        if !self.config.is_tracked(link.protocol_id) {
            tracing::debug!(link_key, protocol = %link.protocol_id, "Protocol not graphed, skipping link");
            return Ok(SyncOutcome::Skipped);
        }

        let endpoints = match self.resolver.resolve(link, Endpoint::Local).await {
            Ok(local) => self
                .resolver
                .resolve(link, Endpoint::Remote)
                .await
                .map(|remote| (local, remote)),
            Err(e) => Err(e),
        };
        let (local, remote) = match endpoints {
            Ok(pair) => pair,
            Err(e) if e.is_resolution() => {
                if self.cascade.remove_edge_for_link(link_key, action).await? {
                    tracing::info!(link_key, %action, "Removed edge whose endpoint no longer resolves");
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let edge = LsNodeEdge::from_link(link_key, link, &local, &remote);
        let document = serde_json::to_value(&edge).map_err(|e| SyncError::Storage(e.to_string()))?;
        self.upsert(link_key, document).await
    }

    /// Create-then-update, retried while a concurrent remover keeps the
    /// create and the update from both finding their precondition.
    async fn upsert(&self, link_key: &str, document: Value) -> Result<SyncOutcome, SyncError> {
        let collection = &self.config.edge_collection;

        for attempt in 1..=UPSERT_ATTEMPTS {
            let created = self
                .store
                .create_document(collection, document.clone())
                .await
                .map_err(SyncError::from_store)?;
            if created == CreateOutcome::Created {
                tracing::debug!(link_key, from = %document["_from"], to = %document["_to"], "Edge created");
                return Ok(SyncOutcome::Created);
            }

            let updated = self
                .store
                .update_document(collection, link_key, document.clone())
                .await
                .map_err(SyncError::from_store)?;
            if updated == UpdateOutcome::Updated {
                tracing::debug!(link_key, from = %document["_from"], to = %document["_to"], "Edge updated");
                return Ok(SyncOutcome::Updated);
            }
            tracing::debug!(link_key, attempt, "Edge removed between create and update, retrying");
        }

        Err(SyncError::Storage(format!(
            "edge {}/{} kept changing during upsert after {} attempts",
            collection, link_key, UPSERT_ATTEMPTS
        )))
    }
}

impl<S: DocumentStore> Clone for EdgeSynchronizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            resolver: self.resolver.clone(),
            cascade: self.cascade.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::ResolutionFailure;
    use crate::notify::TestNotifier;
    use crate::store::memory::InMemoryError;
    use crate::store::{InMemoryDocumentStore, Query, RemoveOutcome};
    use crate::types::{LsNode, ProtocolId};

    struct Fixture<S: DocumentStore = InMemoryDocumentStore> {
        store: Arc<S>,
        notifier: Arc<TestNotifier>,
        sync: EdgeSynchronizer<S>,
    }

    fn fixture_over<S: DocumentStore>(store: S) -> Fixture<S> {
        let store = Arc::new(store);
        let notifier = Arc::new(TestNotifier::default());
        let config = Arc::new(SyncConfig::default());
        let resolver = EndpointResolver::new(Arc::clone(&store), config.node_collection.clone());
        let cascade = RemovalCascade::new(Arc::clone(&store), notifier.clone(), config.edge_collection.clone());
        let sync = EdgeSynchronizer::new(Arc::clone(&store), config, resolver, cascade);
        Fixture { store, notifier, sync }
    }

    fn fixture() -> Fixture {
        fixture_over(InMemoryDocumentStore::new())
    }

    /// Store whose next `misses` updates report the document as gone, as if
    /// a concurrent delete landed between the create conflict and the update.
    struct RacingDeleteStore {
        inner: InMemoryDocumentStore,
        misses: AtomicUsize,
    }

    impl RacingDeleteStore {
        fn new(misses: usize) -> Self {
            Self {
                inner: InMemoryDocumentStore::new(),
                misses: AtomicUsize::new(misses),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for RacingDeleteStore {
        type Error = InMemoryError;

        async fn read_document(&self, collection: &str, key: &str) -> Result<Option<Value>, Self::Error> {
            self.inner.read_document(collection, key).await
        }

        async fn create_document(&self, collection: &str, document: Value) -> Result<CreateOutcome, Self::Error> {
            self.inner.create_document(collection, document).await
        }

        async fn update_document(
            &self,
            collection: &str,
            key: &str,
            document: Value,
        ) -> Result<UpdateOutcome, Self::Error> {
            let missed = self
                .misses
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if missed {
                return Ok(UpdateOutcome::NotFound);
            }
            self.inner.update_document(collection, key, document).await
        }

        async fn remove_document(&self, collection: &str, key: &str) -> Result<RemoveOutcome, Self::Error> {
            self.inner.remove_document(collection, key).await
        }

        async fn query(&self, query: &Query) -> Result<Vec<Value>, Self::Error> {
            self.inner.query(query).await
        }
    }

    fn seed_nodes(store: &InMemoryDocumentStore) {
        store
            .put("ls_node", "a", &LsNode::new(ProtocolId::IsisL2, 1, "", "0000.0000.0001"))
            .unwrap();
        store
            .put("ls_node", "b", &LsNode::new(ProtocolId::IsisL2, 1, "", "0000.0000.0002"))
            .unwrap();
    }

    fn link() -> LsLink {
        LsLink::new("L1", ProtocolId::IsisL2, 1, "0000.0000.0001", "0000.0000.0002")
            .with_link_ips("10.0.0.0", "10.0.0.1")
    }

    #[tokio::test]
    async fn test_creates_edge() {
        let f = fixture();
        seed_nodes(&f.store);

        let outcome = f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Created);

        let edge = f.store.get("ls_node_edge", "L1").unwrap();
        assert_eq!(edge["_from"], "ls_node/a");
        assert_eq!(edge["_to"], "ls_node/b");
        assert_eq!(edge["_id"], "ls_node_edge/L1");
        assert_eq!(edge["local_link_ip"], "10.0.0.0");
    }

    #[tokio::test]
    async fn test_repeat_is_idempotent() {
        let f = fixture();
        seed_nodes(&f.store);

        f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();
        let first = f.store.get("ls_node_edge", "L1").unwrap();

        let outcome = f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Updated);
        assert_eq!(f.store.count("ls_node_edge"), 1);
        assert_eq!(f.store.get("ls_node_edge", "L1").unwrap(), first);
    }

    #[tokio::test]
    async fn test_update_reflects_link_change() {
        let f = fixture();
        seed_nodes(&f.store);
        f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();

        let mut changed = link();
        changed.local_node_asn = 65001;
        f.sync.sync_edge("L1", &changed, Action::Update).await.unwrap();

        assert_eq!(f.store.get("ls_node_edge", "L1").unwrap()["local_node_asn"], 65001);
    }

    #[tokio::test]
    async fn test_untracked_protocol_skipped() {
        let f = fixture();
        let bgp = LsLink::new("B1", ProtocolId::Bgp, 1, "10.0.0.1", "10.0.0.2");

        assert_eq!(f.sync.sync_edge("B1", &bgp, Action::Add).await.unwrap(), SyncOutcome::Skipped);
        assert_eq!(f.store.count("ls_node_edge"), 0);
    }

    #[tokio::test]
    async fn test_missing_endpoint_creates_nothing() {
        let f = fixture();
        f.store
            .put("ls_node", "a", &LsNode::new(ProtocolId::IsisL2, 1, "", "0000.0000.0001"))
            .unwrap();

        let err = f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Resolution { endpoint: Endpoint::Remote, failure: ResolutionFailure::NotFound, .. }
        ));
        assert_eq!(f.store.count("ls_node_edge"), 0);
        assert!(f.notifier.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_endpoint_removes_stale_edge() {
        let f = fixture();
        seed_nodes(&f.store);
        f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();

        f.store.delete("ls_node", "b");
        assert!(f.sync.sync_edge("L1", &link(), Action::Add).await.is_err());

        assert_eq!(f.store.count("ls_node_edge"), 0);
        assert_eq!(f.notifier.keys(), vec!["L1"]);
        assert_eq!(f.notifier.notifications.lock()[0].action, Action::Add);
    }

    #[tokio::test]
    async fn test_stale_edge_removal_carries_triggering_action() {
        let f = fixture();
        seed_nodes(&f.store);
        f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();

        f.store.delete("ls_node", "a");
        let err = f.sync.sync_edge("L1", &link(), Action::Update).await.unwrap_err();
        assert!(matches!(err, SyncError::Resolution { endpoint: Endpoint::Local, .. }));

        let notifications = f.notifier.notifications.lock();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].key, "L1");
        assert_eq!(notifications[0].action, Action::Update);
    }

    #[tokio::test]
    async fn test_upsert_retries_when_edge_vanishes_before_update() {
        let f = fixture_over(RacingDeleteStore::new(1));
        seed_nodes(&f.store.inner);
        f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();

        let mut changed = link();
        changed.local_node_asn = 65001;
        let outcome = f.sync.sync_edge("L1", &changed, Action::Update).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Updated);
        assert_eq!(f.store.inner.get("ls_node_edge", "L1").unwrap()["local_node_asn"], 65001);
    }

    #[tokio::test]
    async fn test_upsert_gives_up_when_edge_keeps_vanishing() {
        let f = fixture_over(RacingDeleteStore::new(usize::MAX));
        seed_nodes(&f.store.inner);
        f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap();

        let mut changed = link();
        changed.local_node_asn = 65001;
        let err = f.sync.sync_edge("L1", &changed, Action::Update).await.unwrap_err();

        assert!(matches!(err, SyncError::Storage(ref msg) if msg.contains("ls_node_edge/L1")));
        assert_eq!(f.store.inner.get("ls_node_edge", "L1").unwrap()["local_node_asn"], 0);
    }

    #[tokio::test]
    async fn test_edge_store_failure_propagates() {
        let f = fixture();
        seed_nodes(&f.store);
        f.store.fail_collection("ls_node_edge");

        let err = f.sync.sync_edge("L1", &link(), Action::Add).await.unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
    }
}
